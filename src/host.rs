//! Side effects on the host that tests replace with mocks.
use crate::command::ExecutableData;
use std::io;
use std::process::{Command, ExitStatus, Stdio};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserIds {
    pub uid: u32,
    pub gid: u32,
}

#[cfg_attr(test, mockall::automock)]
pub trait HostOps {
    /// Runs a command to completion, its output goes straight to ours.
    fn run(&self, command: &ExecutableData) -> io::Result<ExitStatus>;

    fn lookup_user(&self, name: &str) -> io::Result<Option<UserIds>>;

    fn hostname(&self) -> io::Result<String>;
}

pub struct LocalHost;

impl HostOps for LocalHost {
    fn run(&self, command: &ExecutableData) -> io::Result<ExitStatus> {
        let mut cmd = Command::new(&command.bin);
        cmd.args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }
        cmd.status()
    }

    #[cfg(target_family = "unix")]
    fn lookup_user(&self, name: &str) -> io::Result<Option<UserIds>> {
        let user = nix::unistd::User::from_name(name).map_err(io::Error::from)?;
        Ok(user.map(|u| UserIds {
            uid: u.uid.as_raw(),
            gid: u.gid.as_raw(),
        }))
    }

    #[cfg(not(target_family = "unix"))]
    fn lookup_user(&self, _name: &str) -> io::Result<Option<UserIds>> {
        Err(io::Error::from(io::ErrorKind::Unsupported))
    }

    #[cfg(target_family = "unix")]
    fn hostname(&self) -> io::Result<String> {
        let hostname = nix::unistd::gethostname().map_err(io::Error::from)?;
        hostname
            .into_string()
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "hostname is not valid UTF-8"))
    }

    #[cfg(not(target_family = "unix"))]
    fn hostname(&self) -> io::Result<String> {
        std::env::var("COMPUTERNAME").map_err(|e| io::Error::new(io::ErrorKind::NotFound, e))
    }
}
