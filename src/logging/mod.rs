pub mod config;
pub mod file_logging;
pub mod format;

pub use config::{LogLevel, LoggingConfig, LoggingError};
