//! Task handles for cooperative cancellation of background work.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Identity plus cancellation signal of one in-flight asynchronous operation.
///
/// The owning record keeps the handle; the task itself holds a clone of the
/// token from [`TaskHandle::token`] and checks it at every polling point.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: u64,
    cancel: CancellationToken,
}

impl TaskHandle {
    /// Creates a handle with a fresh cancellation signal.
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self {
            id,
            cancel: CancellationToken::new(),
        }
    }

    /// Creates a handle whose signal also fires when `parent` is cancelled.
    #[must_use]
    pub fn child_of(id: u64, parent: &CancellationToken) -> Self {
        Self {
            id,
            cancel: parent.child_token(),
        }
    }

    /// Returns the task identity.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns a clone of the cancellation token for the task body.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Signals cancellation.
    ///
    /// Returns `true` only for the call that actually fired the signal.
    pub fn cancel(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        debug!(task_id = self.id, "cancelling task");
        self.cancel.cancel();
        true
    }

    /// Returns whether cancellation has been signalled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Sleeps for `delay` unless `token` fires first.
///
/// Returns `true` when the full delay elapsed, `false` when cancelled.
pub async fn sleep_unless_cancelled(delay: Duration, token: &CancellationToken) -> bool {
    if delay.is_zero() {
        return !token.is_cancelled();
    }
    tokio::select! {
        biased;
        () = token.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}
