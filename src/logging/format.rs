use serde::{Deserialize, Serialize};

/// Represents a custom time stamp format for logging.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TimestampFormat(pub String);

/// Provides a default `TimestampFormat`. The default format is based on
/// [chrono strftime](https://docs.rs/chrono/latest/chrono/format/strftime/index.html#fn7)
impl Default for TimestampFormat {
    fn default() -> Self {
        Self("%Y-%m-%dT%H:%M:%S".to_string())
    }
}

/// Defines the format to be used for logging, including target and timestamp.
///
/// # Fields:
/// - `target`: whether the target of the trace event is included in the formatted output.
/// - `timestamp`: the `TimestampFormat` used for log timestamps.
/// - `ansi_colors`: whether ansi colors are used in stdout logs.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone, Default)]
pub struct LoggingFormat {
    #[serde(default)]
    pub target: bool,
    #[serde(default)]
    pub timestamp: TimestampFormat,
    #[serde(default)]
    pub ansi_colors: bool,
}
