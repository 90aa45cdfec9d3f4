//! Single-assignment reply cell
//!
//! [`waiter`] creates a connected pair: the [`Completer`] is stored in the
//! correlation table and fulfilled by the outbound dispatcher, the [`Waiter`]
//! is held by the caller that is waiting for the reply. A pair is pending
//! until it becomes exactly one of completed (the completer delivered a
//! value) or abandoned (the completer was dropped without delivering).

use tokio::sync::oneshot;
use tokio::time::Instant;

/// Create a connected completer/waiter pair
pub fn waiter() -> (Completer, Waiter) {
    let (tx, rx) = oneshot::channel();
    (Completer { tx }, Waiter { rx })
}

/// Write side of the cell
#[derive(Debug)]
pub struct Completer {
    tx: oneshot::Sender<String>,
}

impl Completer {
    /// Deliver the reply. Consumes the completer, so a cell completes at most once.
    ///
    /// Returns `false` when the waiter is already gone (it timed out and was
    /// dropped), in which case the value is discarded.
    pub fn complete(self, value: impl Into<String>) -> bool {
        self.tx.send(value.into()).is_ok()
    }

    /// Whether the waiting side has been dropped
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }
}

/// How a wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The completer delivered a value
    Completed(String),
    /// The deadline passed first
    TimedOut,
    /// The completer was dropped without a value
    Abandoned,
}

/// Read side of the cell
#[derive(Debug)]
pub struct Waiter {
    rx: oneshot::Receiver<String>,
}

impl Waiter {
    /// Wait for the value until `deadline`.
    ///
    /// Abandonment is reported as soon as the completer is dropped, which can
    /// be well before the deadline.
    pub async fn wait_until(self, deadline: Instant) -> WaitOutcome {
        match tokio::time::timeout_at(deadline, self.rx).await {
            Ok(Ok(value)) => WaitOutcome::Completed(value),
            Ok(Err(_)) => WaitOutcome::Abandoned,
            Err(_) => WaitOutcome::TimedOut,
        }
    }
}
