use super::config::LoggingError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};

/// Hourly rolling log file, written from a background worker.
#[derive(Debug, Deserialize, Serialize, Default, PartialEq, Clone)]
pub struct FileLoggingConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl FileLoggingConfig {
    pub(super) fn setup(&self) -> Result<Option<(NonBlocking, WorkerGuard)>, LoggingError> {
        if !self.enable {
            return Ok(None);
        }

        let path = self
            .path
            .clone()
            .ok_or(LoggingError::LogFilePathNotDefined)?;
        let LogFilePath { parent, file_name } = LogFilePath::try_from(path)?;
        let file_appender = tracing_appender::rolling::hourly(parent, file_name);
        Ok(Some(tracing_appender::non_blocking(file_appender)))
    }
}

#[derive(Debug, PartialEq)]
struct LogFilePath {
    parent: PathBuf,
    file_name: PathBuf,
}

impl TryFrom<PathBuf> for LogFilePath {
    type Error = LoggingError;

    fn try_from(value: PathBuf) -> Result<Self, Self::Error> {
        let parent = value
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(LoggingError::InvalidFilePath(
                "file path provided must have a valid parent directory".into(),
            ))?
            .into();
        let file_name = value
            .file_name()
            .ok_or(LoggingError::InvalidFilePath(
                "file path provided must have a valid file name".into(),
            ))?
            .into();
        Ok(Self { parent, file_name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn disabled_file_logging_sets_nothing_up() {
        let config = FileLoggingConfig {
            enable: false,
            path: None,
        };

        assert!(config.setup().unwrap().is_none());
    }

    #[test]
    fn enabled_without_path_fails() {
        let config = FileLoggingConfig {
            enable: true,
            path: None,
        };

        assert_matches!(config.setup(), Err(LoggingError::LogFilePathNotDefined));
    }

    #[test]
    fn file_path_is_split() {
        let path = LogFilePath::try_from(PathBuf::from("/var/log/ghrunner/ghrunner.log")).unwrap();

        assert_eq!(path.parent, PathBuf::from("/var/log/ghrunner"));
        assert_eq!(path.file_name, PathBuf::from("ghrunner.log"));
    }

    #[test]
    fn bare_file_name_is_invalid() {
        assert_matches!(
            LogFilePath::try_from(PathBuf::from("ghrunner.log")),
            Err(LoggingError::InvalidFilePath(_))
        );
        assert_matches!(
            LogFilePath::try_from(PathBuf::from("/")),
            Err(LoggingError::InvalidFilePath(_))
        );
    }
}
