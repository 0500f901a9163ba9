use super::error::CliError;
use super::RootDirArgs;
use crate::config::RunnerConfig;
use crate::supervisor::shutdown::{install_signal_handler, ShutdownCoordinator};
use crate::supervisor::{Supervisor, SupervisorConfig};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(clap::Args, Debug)]
pub struct Args {
    #[command(flatten)]
    root: RootDirArgs,

    /// Run `./run.sh --once` directly instead of through the user's login shell
    #[arg(long)]
    no_login_shell: bool,
}

impl Args {
    pub fn root_dir(&self) -> PathBuf {
        self.root.root_dir()
    }

    pub fn no_login_shell(&self) -> bool {
        self.no_login_shell
    }
}

/// Supervises every runner below the root directory until interrupted.
pub fn run(args: Args, runner_config: &RunnerConfig) -> Result<(), CliError> {
    let root_dir = args.root_dir();

    let coordinator = Arc::new(ShutdownCoordinator::new());
    install_signal_handler(coordinator.clone())
        .map_err(|err| CliError::Precondition(format!("installing signal handler: {err}")))?;

    let config = SupervisorConfig::new(root_dir.clone())
        .with_login_shell(runner_config.login_shell && !args.no_login_shell);

    let summary = Supervisor::new(config)
        .run(&coordinator)
        .map_err(|err| CliError::Command(err.to_string()))?;

    if summary.runners == 0 {
        return Err(CliError::Command(format!(
            "no runners found in {}",
            root_dir.display()
        )));
    }
    Ok(())
}
