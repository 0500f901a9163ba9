use crate::locator::DiscoveryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("discovering runners: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("could not spawn the thread for runner `{dir}`: {source}")]
    Spawn {
        dir: String,
        #[source]
        source: std::io::Error,
    },
}
