//! Fleet-wide shutdown: one cancellation signal, two-stage interrupt handling and the wait for
//! every runner loop to finish.
use crate::event::cancellation::{cancellation, CancellationToken, Canceller};
use crossbeam::sync::WaitGroup;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Exit code used when the operator forces the supervisor out before runners drain.
pub const FORCED_EXIT_CODE: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptAction {
    GracefulShutdown,
    ForceExit,
}

pub struct ShutdownCoordinator {
    canceller: Canceller,
    token: CancellationToken,
    interrupted: AtomicBool,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (canceller, token) = cancellation();
        Self {
            canceller,
            token,
            interrupted: AtomicBool::new(false),
        }
    }

    /// A reader of the cancellation signal for one runner loop.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Cancels every runner loop. Only the first call has any effect.
    pub fn cancel(&self) -> bool {
        self.canceller.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.canceller.is_cancelled()
    }

    /// Records an external interrupt. The first one cancels the fleet, any later one asks for an
    /// immediate exit.
    pub fn on_interrupt(&self) -> InterruptAction {
        if self.interrupted.swap(true, Ordering::SeqCst) {
            return InterruptAction::ForceExit;
        }
        self.cancel();
        InterruptAction::GracefulShutdown
    }

    /// Blocks until every clone of `completion` handed to a runner loop has been dropped.
    pub fn wait_for_completion(&self, completion: WaitGroup) {
        completion.wait();
    }
}

/// Routes SIGINT and SIGTERM to the coordinator. Can only be installed once per process.
pub fn install_signal_handler(coordinator: Arc<ShutdownCoordinator>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        let action = coordinator.on_interrupt();
        report_interrupt(action);
        if action == InterruptAction::ForceExit {
            process::exit(FORCED_EXIT_CODE);
        }
    })
}

fn report_interrupt(action: InterruptAction) {
    match action {
        InterruptAction::GracefulShutdown => warn!(
            "Shutting down gracefully, waiting for runners to finish their jobs... (press Ctrl+C again to force exit)"
        ),
        InterruptAction::ForceExit => {
            warn!("Forced exit requested, runners are left as they are")
        }
    }
}
