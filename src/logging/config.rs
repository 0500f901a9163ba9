use super::file_logging::FileLoggingConfig;
use super::format::LoggingFormat;
use crate::defaults::LOG_LEVEL_ENV_VAR;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::PrettyFields;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const CRATE_LOG_TARGET: &str = "ghrunner";

/// An enum representing possible errors during the logging initialization.
#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("init logging error: `{0}`")]
    TryInitError(String),
    #[error("invalid logging directive: `{0}`")]
    InvalidDirective(String),
    #[error("invalid logging file path: `{0}`")]
    InvalidFilePath(String),
    #[error("logging file path not defined")]
    LogFilePathNotDefined,
}

/// Defines the logging configuration for the supervisor.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LoggingFormat,
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub file: FileLoggingConfig,
}

pub type FileLoggerGuard = Option<WorkerGuard>;

impl LoggingConfig {
    pub fn with_level(self, level: Level) -> Self {
        Self {
            level: LogLevel(level),
            ..self
        }
    }

    /// Attempts to initialize the global logging subscriber with the inner configuration.
    ///
    /// The returned guard flushes the file logs when dropped, so it must outlive the run.
    pub fn try_init(&self) -> Result<FileLoggerGuard, LoggingError> {
        let target = self.format.target;
        let timestamp_fmt = self.format.timestamp.0.clone();

        let (file_layer, guard) = match self.file.setup()? {
            Some((file_writer, guard)) => {
                let file_layer = tracing_subscriber::fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false) // Disable colors for file
                    .with_target(target)
                    .with_timer(ChronoLocal::new(timestamp_fmt.clone()))
                    .fmt_fields(PrettyFields::new())
                    .with_filter(self.logging_filter()?);
                (Some(file_layer), Some(guard))
            }
            None => (None, None),
        };

        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(self.format.ansi_colors)
            .with_target(target)
            .with_timer(ChronoLocal::new(timestamp_fmt))
            .fmt_fields(PrettyFields::new())
            .with_filter(self.logging_filter()?);

        tracing_subscriber::Registry::default()
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .map_err(|_| {
                LoggingError::TryInitError("unable to set global logging subscriber".to_string())
            })?;

        debug!("Logging initialized successfully");
        Ok(guard)
    }

    fn crate_directive(&self) -> Result<Directive, LoggingError> {
        let level = self.level.as_level().to_string().to_lowercase();
        let directive = format!("{CRATE_LOG_TARGET}={level}");
        directive
            .parse::<Directive>()
            .map_err(|err| LoggingError::InvalidDirective(format!("{directive}: {err}")))
    }

    fn logging_filter(&self) -> Result<EnvFilter, LoggingError> {
        Ok(EnvFilter::builder()
            .with_default_directive(self.crate_directive()?)
            .with_env_var(LOG_LEVEL_ENV_VAR)
            .from_env_lossy())
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub struct LogLevel(Level);

impl LogLevel {
    pub fn as_level(&self) -> Level {
        self.0
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self(Level::INFO)
    }
}

impl<'de> Deserialize<'de> for LogLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value_str = String::deserialize(deserializer)?;
        Level::from_str(&value_str)
            .map(LogLevel)
            .map_err(serde::de::Error::custom)
    }
}

impl Serialize for LogLevel {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string().to_lowercase())
    }
}
