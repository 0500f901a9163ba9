//! OS service definitions starting the supervisor at boot (systemd) or login (launchd).
pub mod launchd;
pub mod systemd;

use crate::command::ExecutableData;
use crate::defaults::{SERVICE_LOG_DIR_NAME, SYSTEMD_UNIT_DIR};
use crate::host::{HostOps, LocalHost};
use crate::locator::{search_runner_dirs, DiscoveryError};
use crate::utils::is_elevated::is_elevated;
use crate::utils::path::{home_dir, relative_to};
use launchd::LaunchAgentService;
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use systemd::SystemdServices;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("unsupported OS: {0}")]
    UnsupportedOs(String),
    #[error("{0} command on Linux requires root privileges. Please run with sudo")]
    NotElevated(&'static str),
    #[error("no runners found in {0}")]
    NoRunners(PathBuf),
    #[error("failed to search runner dirs: {0}")]
    Discovery(#[from] DiscoveryError),
    #[error("unknown user {0}")]
    UnknownUser(String),
    #[error("home directory is unknown")]
    UnknownHome,
    #[error("failed to get executable path: {0}")]
    Executable(#[source] std::io::Error),
    #[error("`{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command}` failed: {reason}")]
    Command { command: String, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Enable,
    Disable,
    Stop,
}

impl ServiceAction {
    fn name(&self) -> &'static str {
        match self {
            ServiceAction::Enable => "enable",
            ServiceAction::Disable => "disable",
            ServiceAction::Stop => "stop",
        }
    }
}

/// Applies `action` with the service manager of the running OS.
pub fn manage(action: ServiceAction, root_dir: &Path) -> Result<(), ServiceError> {
    match std::env::consts::OS {
        "macos" => {
            let home = home_dir().ok_or(ServiceError::UnknownHome)?;
            let service = LaunchAgentService::new(
                LocalHost,
                root_dir.to_path_buf(),
                home.join("Library").join("LaunchAgents"),
                home.join("Library").join("Logs").join(SERVICE_LOG_DIR_NAME),
                current_exe()?,
            );
            match action {
                ServiceAction::Enable => service.enable().map(|_| ()),
                ServiceAction::Disable => service.disable().map(|_| ()),
                ServiceAction::Stop => service.stop().map(|_| ()),
            }
        }
        "linux" => {
            if !is_elevated().unwrap_or(false) {
                return Err(ServiceError::NotElevated(action.name()));
            }
            let services = SystemdServices::new(
                LocalHost,
                root_dir.to_path_buf(),
                PathBuf::from(SYSTEMD_UNIT_DIR),
                current_exe()?,
            );
            match action {
                ServiceAction::Enable => services.enable().map(|_| ()),
                ServiceAction::Disable => services.disable().map(|_| ()),
                ServiceAction::Stop => services.stop().map(|_| ()),
            }
        }
        other => Err(ServiceError::UnsupportedOs(other.to_string())),
    }
}

/// Resolved path of the running binary, the one the service definitions point to.
fn current_exe() -> Result<PathBuf, ServiceError> {
    std::env::current_exe()
        .and_then(|exe| exe.canonicalize())
        .map_err(ServiceError::Executable)
}

/// Organizations owning runners: the first path component of every runner below `root_dir`.
pub fn discover_orgs(root_dir: &Path) -> Result<BTreeSet<String>, ServiceError> {
    let runner_dirs = search_runner_dirs(root_dir)?;
    Ok(runner_dirs
        .iter()
        .filter_map(|dir| relative_to(dir.path(), root_dir))
        .filter_map(|rel| match rel.components().next() {
            Some(Component::Normal(org)) => Some(org.to_string_lossy().to_string()),
            _ => None,
        })
        .collect())
}

/// Runs a system command, failing on a non-zero exit.
pub(crate) fn run_checked<H: HostOps>(host: &H, command: &ExecutableData) -> Result<(), ServiceError> {
    let command_line = || {
        std::iter::once(command.bin.display().to_string())
            .chain(command.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    };

    let status = host.run(command).map_err(|e| ServiceError::Command {
        command: command_line(),
        reason: e.to_string(),
    })?;
    if !status.success() {
        return Err(ServiceError::Command {
            command: command_line(),
            reason: format!("exited with {status}"),
        });
    }
    Ok(())
}

#[cfg(target_family = "unix")]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MockHostOps;
    use crate::supervisor::runner::tests::write_runner;
    use assert_matches::assert_matches;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;
    use tempfile::tempdir;

    #[test]
    fn orgs_are_first_components() {
        let root = tempdir().unwrap();
        write_runner(root.path(), "globex/host-1", "");
        write_runner(root.path(), "acme/host-1", "");
        write_runner(root.path(), "acme/pool/host-2", "");

        let orgs = discover_orgs(root.path()).unwrap();

        assert_eq!(
            orgs.into_iter().collect::<Vec<_>>(),
            vec!["acme".to_string(), "globex".to_string()]
        );
    }

    #[test]
    fn root_runner_has_no_org() {
        let root = tempdir().unwrap();
        write_runner(root.path(), "", "");

        assert!(discover_orgs(root.path()).unwrap().is_empty());
    }

    #[test]
    fn missing_root_fails_discovery() {
        let root = tempdir().unwrap();

        assert_matches!(
            discover_orgs(&root.path().join("missing")),
            Err(ServiceError::Discovery(_))
        );
    }

    #[test]
    fn run_checked_reports_failures() {
        let mut host = MockHostOps::new();
        host.expect_run()
            .returning(|_| Ok(ExitStatus::from_raw(3 << 8)));
        let command = ExecutableData::new("systemctl").with_args(vec!["daemon-reload".to_string()]);

        assert_matches!(
            run_checked(&host, &command),
            Err(ServiceError::Command { command, .. }) => {
                assert_eq!(command, "systemctl daemon-reload");
            }
        );
    }
}
