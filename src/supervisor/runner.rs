//! Restart loop driving a single runner directory.
use crate::command::command_os::POLL_INTERVAL;
use crate::command::{
    CommandError, CommandOSNotStarted, CommandOSStarted, ExecutableData, ShutdownOutcome,
};
use crate::defaults::SHUTDOWN_GRACE_PERIOD;
use crate::event::cancellation::CancellationToken;
use crate::locator::RunnerDir;
use std::fs;
use std::io;
use std::process::ExitStatus;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Pause after a failed launch, so a broken entrypoint is not respawned in a tight loop.
pub const LAUNCH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// What ended the wait on a running entrypoint.
enum WaitOutcome {
    Exited(ExitStatus),
    Cancelled,
}

/// Counters of one loop lifetime, kept in memory only.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunnerLoopSummary {
    pub executions: u64,
    pub failed_executions: u64,
    pub launch_errors: u64,
    pub force_killed: bool,
}

pub struct RunnerLoop {
    dir: RunnerDir,
    executable: ExecutableData,
    shutdown_timeout: Duration,
    launch_retry_delay: Duration,
}

impl RunnerLoop {
    pub fn new(dir: RunnerDir, login_shell: bool) -> Self {
        let executable = ExecutableData::runner_entrypoint(&dir, login_shell);
        Self {
            dir,
            executable,
            shutdown_timeout: SHUTDOWN_GRACE_PERIOD,
            launch_retry_delay: LAUNCH_RETRY_DELAY,
        }
    }

    pub fn with_shutdown_timeout(self, shutdown_timeout: Duration) -> Self {
        Self {
            shutdown_timeout,
            ..self
        }
    }

    pub fn with_launch_retry_delay(self, launch_retry_delay: Duration) -> Self {
        Self {
            launch_retry_delay,
            ..self
        }
    }

    pub fn dir(&self) -> &RunnerDir {
        &self.dir
    }

    /// Executes the runner entrypoint over and over until `cancellation` is cancelled.
    ///
    /// At most one process runs at a time and the scratch directory is removed right before each
    /// launch and right after each exit. Once cancelled, a running process gets the shutdown
    /// timeout to finish its job before it is killed, and no new execution is attempted.
    pub fn run(&self, cancellation: &CancellationToken) -> RunnerLoopSummary {
        let dir = &self.dir;
        let mut summary = RunnerLoopSummary::default();

        loop {
            if cancellation.is_cancelled() {
                debug!(runner = %dir, "Runner cancelled before starting a new execution");
                break;
            }

            self.clean_work_dir();

            info!(runner = %dir, "Starting runner: {dir}");
            let started = CommandOSNotStarted::new(dir, &self.executable)
                .with_shutdown_timeout(self.shutdown_timeout)
                .start();

            let mut process = match started {
                Ok(process) => process,
                Err(err) => {
                    error!(runner = %dir, "Runner {dir} error: {err}");
                    summary.launch_errors += 1;
                    self.clean_work_dir();
                    if cancellation.is_cancelled_with_timeout(self.launch_retry_delay) {
                        break;
                    }
                    continue;
                }
            };
            summary.executions += 1;

            match wait_exit(&mut process, cancellation) {
                Ok(WaitOutcome::Exited(status)) => {
                    self.clean_work_dir();
                    if !status.success() {
                        summary.failed_executions += 1;
                        warn!(runner = %dir, exit_code = ?status.code(), "Runner {dir} error: {status}");
                    }
                    info!(runner = %dir, "Runner {dir} completed, restarting...");
                }
                Ok(WaitOutcome::Cancelled) => {
                    info!(runner = %dir, "Stopping runner: {dir} (waiting for current job to finish...)");
                    summary.force_killed = self.stop(&mut process);
                    self.clean_work_dir();
                    break;
                }
                Err(err) => {
                    error!(runner = %dir, "Runner {dir} error: {err}");
                    summary.failed_executions += 1;
                    summary.force_killed = self.stop(&mut process);
                    self.clean_work_dir();
                }
            }
        }

        info!(runner = %dir, "Runner stopped: {dir}");
        summary
    }

    /// Stops a running process, returning whether it had to be killed.
    fn stop(&self, process: &mut CommandOSStarted) -> bool {
        match process.shutdown() {
            Ok(ShutdownOutcome::Graceful) => false,
            Ok(ShutdownOutcome::Killed) => true,
            Err(err) => {
                error!(runner = %self.dir, "Runner {} error: {err}", self.dir);
                false
            }
        }
    }

    fn clean_work_dir(&self) {
        if let Err(err) = remove_work_dir(&self.dir) {
            warn!(runner = %self.dir, "Could not remove {}: {err}", self.dir.work_dir().display());
        }
    }
}

/// Removes the runner scratch directory. Missing is fine, anything else at the path is removed too.
pub fn remove_work_dir(dir: &RunnerDir) -> io::Result<()> {
    let work_dir = dir.work_dir();
    let result = match fs::symlink_metadata(&work_dir) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(&work_dir),
        Ok(_) => fs::remove_file(&work_dir),
        Err(err) => Err(err),
    };
    match result {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Waits for the process to exit or the loop to be cancelled, whatever happens first.
fn wait_exit(
    process: &mut CommandOSStarted,
    cancellation: &CancellationToken,
) -> Result<WaitOutcome, CommandError> {
    loop {
        if let Some(status) = process.try_wait()? {
            return Ok(WaitOutcome::Exited(status));
        }
        // Busy waiting is avoided with `is_cancelled_with_timeout`
        if cancellation.is_cancelled_with_timeout(POLL_INTERVAL) {
            return Ok(WaitOutcome::Cancelled);
        }
    }
}
