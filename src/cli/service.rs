use super::error::CliError;
use super::RootDirArgs;
use crate::service::{manage, ServiceAction, ServiceError};

#[derive(clap::Args, Debug)]
pub struct Args {
    #[command(flatten)]
    root: RootDirArgs,
}

pub fn run(action: ServiceAction, args: Args) -> Result<(), CliError> {
    manage(action, &args.root.root_dir()).map_err(|err| match err {
        ServiceError::NotElevated(_) | ServiceError::UnsupportedOs(_) => {
            CliError::Precondition(err.to_string())
        }
        other => CliError::Command(other.to_string()),
    })
}
