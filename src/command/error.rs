use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("could not launch `{bin}`: {source}")]
    Launch {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("could not signal process group {pgid}: {source}")]
    Signal {
        pgid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("process groups are not supported on this platform")]
    Unsupported,

    #[error("{0}")]
    IOError(#[from] std::io::Error),
}
