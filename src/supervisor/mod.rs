pub mod error;
pub mod runner;
pub mod shutdown;

use crate::defaults::SHUTDOWN_GRACE_PERIOD;
use crate::locator::search_runner_dirs;
use crate::utils::threads::spawn_named_thread;
use crossbeam::sync::WaitGroup;
use error::SupervisorError;
use runner::RunnerLoop;
use shutdown::ShutdownCoordinator;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, dispatcher, error, info, Dispatch};

#[derive(Debug, Clone, PartialEq)]
pub struct SupervisorConfig {
    pub root_dir: PathBuf,
    pub login_shell: bool,
    pub shutdown_timeout: Duration,
}

impl SupervisorConfig {
    pub fn new(root_dir: PathBuf) -> Self {
        Self {
            root_dir,
            login_shell: true,
            shutdown_timeout: SHUTDOWN_GRACE_PERIOD,
        }
    }

    pub fn with_login_shell(self, login_shell: bool) -> Self {
        Self {
            login_shell,
            ..self
        }
    }

    pub fn with_shutdown_timeout(self, shutdown_timeout: Duration) -> Self {
        Self {
            shutdown_timeout,
            ..self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Runner loops launched, and therefore drained, by the run.
    pub runners: usize,
}

pub struct Supervisor {
    config: SupervisorConfig,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        Self { config }
    }

    /// Discovers the runners below the root directory and drives each one in its own thread
    /// until `coordinator` is cancelled. Returns once every runner loop has finished.
    ///
    /// Finding no runners is not an error, the summary reports zero and the caller decides.
    pub fn run(&self, coordinator: &ShutdownCoordinator) -> Result<RunSummary, SupervisorError> {
        let runner_dirs = search_runner_dirs(&self.config.root_dir)?;
        let runners = runner_dirs.len();
        info!("Found {runners} runners");

        if runner_dirs.is_empty() {
            info!("No runners found, exiting");
            return Ok(RunSummary { runners });
        }

        let completion = WaitGroup::new();
        let dispatch = dispatcher::get_default(|d: &Dispatch| d.clone());
        let span = tracing::Span::current();

        for dir in runner_dirs {
            let runner_loop = RunnerLoop::new(dir, self.config.login_shell)
                .with_shutdown_timeout(self.config.shutdown_timeout);
            let thread_name = format!("runner-{}", runner_loop.dir().name());
            let dir_name = runner_loop.dir().to_string();

            let token = coordinator.token();
            let done = completion.clone();
            let dispatch = dispatch.clone();
            let span = span.clone();

            let spawned = spawn_named_thread(thread_name, move || {
                let _guard = dispatcher::set_default(&dispatch);
                let _enter = span.enter();
                let summary = runner_loop.run(&token);
                debug!(runner = %runner_loop.dir(), ?summary, "Runner loop finished");
                drop(done);
            });

            if let Err(source) = spawned {
                error!("Could not start runner {dir_name}, stopping the rest");
                coordinator.cancel();
                coordinator.wait_for_completion(completion);
                return Err(SupervisorError::Spawn {
                    dir: dir_name,
                    source,
                });
            }
        }

        coordinator.wait_for_completion(completion);
        info!("All runners stopped");

        Ok(RunSummary { runners })
    }
}
