use super::{discover_orgs, run_checked, ServiceError};
use crate::command::ExecutableData;
use crate::defaults::SYSTEMD_SERVICE_PREFIX;
use crate::host::HostOps;
use std::fmt::{self, Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SYSTEMCTL: &str = "systemctl";
const LINUX_USER_SHELL: &str = "/bin/bash";

/// One unit per organization, running the supervisor on the organization directory as the
/// organization's own system user.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemdUnit {
    pub org: String,
    pub org_dir: PathBuf,
    pub user: String,
    pub exe_path: PathBuf,
}

impl Display for SystemdUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[Unit]
Description=GitHub Actions Runner - {org}
After=network.target

[Service]
Type=simple
User={user}
ExecStart={exe} start --root-dir={org_dir}
Restart=always
RestartSec=5

[Install]
WantedBy=multi-user.target
",
            org = self.org,
            user = self.user,
            exe = self.exe_path.display(),
            org_dir = self.org_dir.display(),
        )
    }
}

pub fn service_name(org: &str) -> String {
    format!("{SYSTEMD_SERVICE_PREFIX}-{org}")
}

pub struct SystemdServices<H: HostOps> {
    host: H,
    root_dir: PathBuf,
    unit_dir: PathBuf,
    exe_path: PathBuf,
}

impl<H: HostOps> SystemdServices<H> {
    pub fn new(host: H, root_dir: PathBuf, unit_dir: PathBuf, exe_path: PathBuf) -> Self {
        Self {
            host,
            root_dir,
            unit_dir,
            exe_path,
        }
    }

    fn unit_path(&self, service: &str) -> PathBuf {
        self.unit_dir.join(format!("{service}.service"))
    }

    fn systemctl(&self, args: &[&str]) -> ExecutableData {
        ExecutableData::new(SYSTEMCTL).with_args(args.iter().map(|a| a.to_string()).collect())
    }

    /// Installs and enables one unit per organization found below the root directory.
    pub fn enable(&self) -> Result<Vec<String>, ServiceError> {
        let orgs = discover_orgs(&self.root_dir)?;
        if orgs.is_empty() {
            return Err(ServiceError::NoRunners(self.root_dir.clone()));
        }

        let mut enabled = Vec::new();
        for org in orgs {
            let org_dir = self.root_dir.join(&org);
            let user = org.clone();
            self.ensure_user(&user)?;
            self.chown_recursive(&org_dir, &user)?;

            let service = service_name(&org);
            let unit = SystemdUnit {
                org,
                org_dir,
                user: user.clone(),
                exe_path: self.exe_path.clone(),
            };
            let unit_path = self.unit_path(&service);
            fs::write(&unit_path, unit.to_string()).map_err(|source| ServiceError::Io {
                path: unit_path.clone(),
                source,
            })?;

            run_checked(&self.host, &self.systemctl(&["enable", &service]))?;
            info!("Created and enabled systemd service: {service} (user: {user})");
            enabled.push(service);
        }

        run_checked(&self.host, &self.systemctl(&["daemon-reload"]))?;
        info!("Executable: {}", self.exe_path.display());
        info!("To start: sudo systemctl start {SYSTEMD_SERVICE_PREFIX}-<org>");
        info!("To stop:  sudo systemctl stop {SYSTEMD_SERVICE_PREFIX}-<org>");
        Ok(enabled)
    }

    /// Stops, disables and removes the unit of every organization found below the root directory.
    pub fn disable(&self) -> Result<Vec<String>, ServiceError> {
        let orgs = discover_orgs(&self.root_dir)?;
        if orgs.is_empty() {
            info!("No runners found, nothing to disable");
            return Ok(Vec::new());
        }

        let mut removed = Vec::new();
        for org in orgs {
            let service = service_name(&org);
            // not running or not enabled is fine
            let _ = self.host.run(&self.systemctl(&["stop", &service]));
            let _ = self.host.run(&self.systemctl(&["disable", &service]));

            let unit_path = self.unit_path(&service);
            match fs::remove_file(&unit_path) {
                Ok(()) => {
                    info!("Removed systemd service: {service}");
                    removed.push(service);
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => warn!("Failed to remove {}: {err}", unit_path.display()),
            }
        }

        run_checked(&self.host, &self.systemctl(&["daemon-reload"]))?;
        info!("Systemd services removed");
        Ok(removed)
    }

    /// Stops every organization unit, returning how many were actually stopped.
    pub fn stop(&self) -> Result<usize, ServiceError> {
        let orgs = discover_orgs(&self.root_dir)?;
        if orgs.is_empty() {
            info!("No runners found");
            return Ok(0);
        }

        let mut stopped = 0;
        for org in orgs {
            let service = service_name(&org);
            match self.host.run(&self.systemctl(&["stop", &service])) {
                Ok(status) if status.success() => {
                    info!("Stopped service: {service}");
                    stopped += 1;
                }
                _ => continue,
            }
        }

        info!("Stopped {stopped} services.");
        Ok(stopped)
    }

    fn ensure_user(&self, user: &str) -> Result<(), ServiceError> {
        if self.lookup(user)?.is_some() {
            info!("User {user} already exists");
            return Ok(());
        }

        // a login shell is needed for the runner environment to load
        let useradd = ExecutableData::new("useradd").with_args(vec![
            "--system".to_string(),
            "--create-home".to_string(),
            "--shell".to_string(),
            LINUX_USER_SHELL.to_string(),
            user.to_string(),
        ]);
        run_checked(&self.host, &useradd)?;
        info!("Created system user: {user}");
        Ok(())
    }

    fn chown_recursive(&self, path: &Path, user: &str) -> Result<(), ServiceError> {
        let ids = self
            .lookup(user)?
            .ok_or_else(|| ServiceError::UnknownUser(user.to_string()))?;
        let chown = ExecutableData::new("chown").with_args(vec![
            "-R".to_string(),
            format!("{}:{}", ids.uid, ids.gid),
            path.display().to_string(),
        ]);
        run_checked(&self.host, &chown)
    }

    fn lookup(&self, user: &str) -> Result<Option<crate::host::UserIds>, ServiceError> {
        self.host
            .lookup_user(user)
            .map_err(|e| ServiceError::Command {
                command: format!("lookup user {user}"),
                reason: e.to_string(),
            })
    }
}
