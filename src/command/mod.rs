pub mod command_os;
pub mod error;
pub mod executable_data;

pub use command_os::{CommandOSNotStarted, CommandOSStarted, ShutdownOutcome};
pub use error::CommandError;
pub use executable_data::ExecutableData;
