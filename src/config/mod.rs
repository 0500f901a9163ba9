//! Supervisor configuration: an optional YAML file overridden by `GHRUNNER_` environment variables.
use crate::defaults::CONFIG_ENV_VAR_PREFIX;
use crate::logging::LoggingConfig;
use ::config::{Config, Environment};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("reading config file `{path}`: `{source}`")]
    IOError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing config file: `{0}`")]
    SerdeYamlError(#[from] serde_yaml::Error),
    #[error("building config: `{0}`")]
    ConfigError(#[from] ::config::ConfigError),
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct GhRunnerConfig {
    #[serde(default)]
    pub log: LoggingConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct RunnerConfig {
    /// Wrap the runner entrypoint in the user's login shell.
    #[serde(default = "default_login_shell")]
    pub login_shell: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            login_shell: default_login_shell(),
        }
    }
}

fn default_login_shell() -> bool {
    true
}

pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    /// Loads the file (when given) and applies environment overrides on top of it.
    ///
    /// Eg. `GHRUNNER_LOG__LEVEL=debug` sets the `log.level` key. The double underscore separates
    /// nesting levels since keys are already snake_case.
    pub fn load(&self) -> Result<GhRunnerConfig, ConfigError> {
        let file_config = match &self.path {
            Some(path) => read_config_file(path)?,
            None => GhRunnerConfig::default(),
        };

        let config = Config::builder()
            .add_source(Config::try_from(&file_config)?)
            .add_source(
                Environment::with_prefix(CONFIG_ENV_VAR_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<GhRunnerConfig>()?;

        Ok(config)
    }
}

fn read_config_file(path: &Path) -> Result<GhRunnerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::IOError {
        path: path.to_path_buf(),
        source,
    })?;
    if content.trim().is_empty() {
        return Ok(GhRunnerConfig::default());
    }
    Ok(serde_yaml::from_str(&content)?)
}
