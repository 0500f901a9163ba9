use super::error::CommandError;
use super::executable_data::ExecutableData;
use crate::defaults::SHUTDOWN_GRACE_PERIOD;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How a started process ended after [CommandOSStarted::shutdown].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Exited on its own within the shutdown timeout.
    Graceful,
    /// Had to be killed.
    Killed,
}

////////////////////////////////////////////////////////////////////////////////////
// States for Started/Not Started Command
////////////////////////////////////////////////////////////////////////////////////
pub struct CommandOSNotStarted {
    id: String,
    bin: String,
    cmd: Command,
    shutdown_timeout: Duration,
}

#[derive(Debug)]
pub struct CommandOSStarted {
    id: String,
    process: Child,
    shutdown_timeout: Duration,
}

////////////////////////////////////////////////////////////////////////////////////
// Not Started Command OS
////////////////////////////////////////////////////////////////////////////////////
impl CommandOSNotStarted {
    pub fn new(id: impl ToString, executable_data: &ExecutableData) -> Self {
        let mut cmd = Command::new(&executable_data.bin);
        cmd.args(&executable_data.args)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        if let Some(dir) = &executable_data.working_dir {
            cmd.current_dir(dir);
        }

        // A group of its own keeps terminal interrupts away from the child, the supervisor decides
        // when it gets signaled.
        #[cfg(target_family = "unix")]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        Self {
            id: id.to_string(),
            bin: executable_data.bin.display().to_string(),
            cmd,
            shutdown_timeout: SHUTDOWN_GRACE_PERIOD,
        }
    }

    pub fn with_shutdown_timeout(self, shutdown_timeout: Duration) -> Self {
        Self {
            shutdown_timeout,
            ..self
        }
    }

    pub fn start(mut self) -> Result<CommandOSStarted, CommandError> {
        let process = self.cmd.spawn().map_err(|source| CommandError::Launch {
            bin: self.bin,
            source,
        })?;

        debug!(id = %self.id, pid = process.id(), "Process started");

        Ok(CommandOSStarted {
            id: self.id,
            process,
            shutdown_timeout: self.shutdown_timeout,
        })
    }
}

////////////////////////////////////////////////////////////////////////////////////
// Started Command OS
////////////////////////////////////////////////////////////////////////////////////
impl CommandOSStarted {
    pub fn get_pid(&self) -> u32 {
        self.process.id()
    }

    pub fn is_running(&mut self) -> bool {
        self.process.try_wait().is_ok_and(|v| v.is_none())
    }

    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>, CommandError> {
        self.process.try_wait().map_err(CommandError::from)
    }

    pub fn wait(&mut self) -> Result<ExitStatus, CommandError> {
        self.process.wait().map_err(CommandError::from)
    }

    fn is_running_after_timeout(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        while Instant::now() < deadline {
            if !self.is_running() {
                return false;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        self.is_running()
    }

    /// Asks the whole process group to stop and kills it if it is still alive once the shutdown
    /// timeout elapses. Always reaps the process before returning `Ok`.
    pub fn shutdown(&mut self) -> Result<ShutdownOutcome, CommandError> {
        if !self.is_running() {
            self.wait()?;
            return Ok(ShutdownOutcome::Graceful);
        }

        let graceful_shutdown_result = self.graceful_shutdown();

        if let Err(e) = &graceful_shutdown_result {
            warn!(id = %self.id, "Graceful shutdown failed for process {}: {e}", self.get_pid());
        }

        if graceful_shutdown_result.is_ok() && !self.is_running_after_timeout(self.shutdown_timeout)
        {
            self.wait()?;
            return Ok(ShutdownOutcome::Graceful);
        }

        warn!("Runner {} didn't stop in time, force killing...", self.id);
        self.force_kill();
        self.wait()?;
        Ok(ShutdownOutcome::Killed)
    }

    #[cfg(target_family = "unix")]
    fn graceful_shutdown(&self) -> Result<(), CommandError> {
        self.signal_group(nix::sys::signal::SIGINT)
    }

    #[cfg(not(target_family = "unix"))]
    fn graceful_shutdown(&self) -> Result<(), CommandError> {
        Err(CommandError::Unsupported)
    }

    fn force_kill(&mut self) {
        #[cfg(target_family = "unix")]
        {
            match self.signal_group(nix::sys::signal::SIGKILL) {
                Ok(()) => return,
                Err(e) => debug!(id = %self.id, "Falling back to killing the process alone: {e}"),
            }
        }

        if let Err(e) = self.process.kill() {
            warn!(id = %self.id, "Could not kill process {}: {e}", self.get_pid());
        }
    }

    #[cfg(target_family = "unix")]
    fn signal_group(&self, signal: nix::sys::signal::Signal) -> Result<(), CommandError> {
        use nix::{sys::signal, unistd::Pid};
        let pgid = self.get_pid();

        signal::killpg(Pid::from_raw(pgid as i32), signal).map_err(|err| CommandError::Signal {
            pgid,
            source: std::io::Error::from(err),
        })
    }
}
