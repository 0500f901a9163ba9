//! Command line entrypoint: parses the flags, loads the configuration and logging, and dispatches
//! to the requested subcommand.
pub mod error;
pub mod service;
pub mod setup;
pub mod start;

use crate::config::ConfigLoader;
use crate::defaults::{DEFAULT_ROOT_DIR, ROOT_DIR_ENV_VAR};
use crate::service::ServiceAction;
use crate::utils::path::expand_home;
use clap::{Parser, Subcommand};
use error::CliError;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, Level};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional YAML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides the configured log level
    #[arg(long, global = true)]
    log_level: Option<Level>,

    /// Print the parsed flags and exit
    #[arg(long, global = true)]
    print_debug_info: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every runner found below the root directory until interrupted
    Start(start::Args),
    /// Download, install and register runners for the given organizations
    Setup(setup::Args),
    /// Install the OS service that starts the supervisor automatically
    Enable(service::Args),
    /// Stop and remove the OS service
    Disable(service::Args),
    /// Stop the OS service without removing it
    Stop(service::Args),
}

/// Root directory holding the runner installations, shared by every subcommand.
#[derive(clap::Args, Debug)]
pub struct RootDirArgs {
    /// Directory holding the runner installations
    #[arg(long, env = ROOT_DIR_ENV_VAR, default_value = DEFAULT_ROOT_DIR)]
    root_dir: String,
}

impl RootDirArgs {
    /// Absolute root directory, relative values are taken from the current directory.
    pub fn root_dir(&self) -> PathBuf {
        let root_dir = expand_home(&self.root_dir);
        std::path::absolute(&root_dir).unwrap_or(root_dir)
    }
}

impl Cli {
    pub fn run() -> ExitCode {
        let cli = Self::parse();

        if cli.print_debug_info {
            println!("Printing debug info");
            println!("FLAGS: {cli:#?}");
            return ExitCode::SUCCESS;
        }

        match cli.execute() {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                // Logging may not be initialized yet.
                match &err {
                    CliError::Config(_) | CliError::Logging(_) => eprintln!("{err}"),
                    _ => error!("{err}"),
                }
                err.into()
            }
        }
    }

    fn execute(self) -> Result<(), CliError> {
        let config = ConfigLoader::new(self.config).load()?;

        let mut log_config = config.log.clone();
        if let Some(level) = self.log_level {
            log_config = log_config.with_level(level);
        }
        let _guard = log_config.try_init()?;

        match self.command {
            Commands::Start(args) => start::run(args, &config.runner),
            Commands::Setup(args) => setup::run(args),
            Commands::Enable(args) => service::run(ServiceAction::Enable, args),
            Commands::Disable(args) => service::run(ServiceAction::Disable, args),
            Commands::Stop(args) => service::run(ServiceAction::Stop, args),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn start_flags() {
        let cli = Cli::try_parse_from([
            "ghrunner",
            "start",
            "--root-dir",
            "/opt/runners",
            "--no-login-shell",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.log_level, Some(Level::DEBUG));
        assert_matches!(cli.command, Commands::Start(args) => {
            assert_eq!(args.root_dir(), PathBuf::from("/opt/runners"));
            assert!(args.no_login_shell());
        });
    }

    #[test]
    fn relative_root_dir_is_made_absolute() {
        let cli = Cli::try_parse_from(["ghrunner", "start", "--root-dir", "runners"]).unwrap();

        assert_matches!(cli.command, Commands::Start(args) => {
            assert_eq!(
                args.root_dir(),
                std::env::current_dir().unwrap().join("runners")
            );
        });
    }

    #[test]
    fn setup_splits_lists() {
        let cli = Cli::try_parse_from([
            "ghrunner",
            "setup",
            "--github-token",
            "secret",
            "--orgs",
            "acme,initech",
            "--additional-labels",
            "gpu,large",
        ])
        .unwrap();

        assert_matches!(cli.command, Commands::Setup(args) => {
            let options = args.options();
            assert_eq!(options.orgs, vec!["acme", "initech"]);
            assert_eq!(options.additional_labels, vec!["gpu", "large"]);
            assert_eq!(options.runners_per_org, 2);
            assert!(!format!("{args:?}").contains("secret"));
        });
    }

    #[test]
    fn setup_requires_orgs() {
        let result = Cli::try_parse_from(["ghrunner", "setup", "--github-token", "secret"]);
        assert!(result.is_err());
    }

    #[test]
    fn setup_rejects_zero_runners() {
        let result = Cli::try_parse_from([
            "ghrunner",
            "setup",
            "--github-token",
            "secret",
            "--orgs",
            "acme",
            "--runners-per-org",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn exit_codes() {
        assert_eq!(
            ExitCode::from(CliError::Precondition("root".into())),
            ExitCode::from(69)
        );
        assert_eq!(
            ExitCode::from(CliError::Command("boom".into())),
            ExitCode::from(1)
        );
    }
}
