//! Supervisor-wide cancellation signal.
//!
//! The signal is a channel nobody ever sends through: cancelling closes it by dropping its only
//! publisher, and every [CancellationToken] clone observes the disconnection. Readers never take a
//! lock and the transition can only happen once.
use super::channel::{pub_sub, EventConsumer, EventPublisher};
use crossbeam::channel::RecvTimeoutError;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

pub type CancellationMessage = ();

/// Read side of the cancellation signal, cheap to clone and share across threads.
pub type CancellationToken = EventConsumer<CancellationMessage>;

impl EventConsumer<CancellationMessage> {
    /// Checks whether the consumer is cancelled immediately.
    ///
    /// Calls [`Self::is_cancelled_with_timeout`] with a timeout of zero.
    pub fn is_cancelled(&self) -> bool {
        self.is_cancelled_with_timeout(Duration::ZERO)
    }

    /// Checks whether the consumer is cancelled for the given timeout.
    ///
    /// It returns true if the consumer received a cancellation message or the channel was closed
    /// before the provided timeout is elapsed. Otherwise it blocks until the timeout is elapsed
    /// and returns false.
    pub fn is_cancelled_with_timeout(&self, timeout: Duration) -> bool {
        match self.as_ref().recv_timeout(timeout) {
            Ok(_) | Err(RecvTimeoutError::Disconnected) => true,
            Err(RecvTimeoutError::Timeout) => false,
        }
    }
}

/// Write side of the cancellation signal. Goes from not-cancelled to cancelled exactly once.
pub struct Canceller {
    publisher: Mutex<Option<EventPublisher<CancellationMessage>>>,
}

/// Creates a new cancellation signal, returning its single writer and a first reader.
pub fn cancellation() -> (Canceller, CancellationToken) {
    let (publisher, consumer) = pub_sub();
    (
        Canceller {
            publisher: Mutex::new(Some(publisher)),
        },
        consumer,
    )
}

impl Canceller {
    /// Cancels every token. Returns `true` only for the call performing the transition, further
    /// calls have no effect.
    pub fn cancel(&self) -> bool {
        self.publisher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.publisher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn tokens_are_not_cancelled_until_cancel() {
        let (canceller, token) = cancellation();

        assert!(!canceller.is_cancelled());
        assert!(!token.is_cancelled());
        assert!(!token.is_cancelled_with_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn cancel_is_observed_by_every_clone() {
        let (canceller, token) = cancellation();
        let clones: Vec<CancellationToken> = (0..5).map(|_| token.clone()).collect();

        assert!(canceller.cancel());

        assert!(canceller.is_cancelled());
        assert!(token.is_cancelled());
        assert!(clones.iter().all(|t| t.is_cancelled()));
        // permanent: checking does not consume the signal
        assert!(clones.iter().all(|t| t.is_cancelled()));
    }

    #[test]
    fn cancel_happens_only_once() {
        let (canceller, token) = cancellation();

        assert!(canceller.cancel());
        assert!(!canceller.cancel());
        assert!(!canceller.cancel());
        assert!(token.is_cancelled());
    }

    #[test]
    fn waiting_token_wakes_up_on_cancel() {
        let (canceller, token) = cancellation();

        let waiter = thread::spawn(move || {
            let start = Instant::now();
            let cancelled = token.is_cancelled_with_timeout(Duration::from_secs(10));
            (cancelled, start.elapsed())
        });

        thread::sleep(Duration::from_millis(50));
        canceller.cancel();

        let (cancelled, elapsed) = waiter.join().unwrap();
        assert!(cancelled);
        assert!(elapsed < Duration::from_secs(5));
    }
}
