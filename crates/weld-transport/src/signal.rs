//! Shutdown signaling shared between the runtime and the adapters.

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Cancellation token plus task tracker handed to a transport adapter.
///
/// The adapter stops accepting new inbound work once the token is
/// cancelled and registers every per-request task with the tracker so
/// the shutdown coordinator can wait for in-flight work to drain.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    token: CancellationToken,
    tracker: TaskTracker,
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Creates a fresh, uncancelled signal.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    /// Signals the adapter to stop accepting new work.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// True once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Spawns a tracked per-request task.
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tracker.spawn(future)
    }

    /// Closes the tracker; [`drained`](Self::drained) can then resolve.
    pub fn close(&self) {
        self.tracker.close();
    }

    /// Resolves once the tracker is closed and every tracked task has
    /// finished.
    pub async fn drained(&self) {
        self.tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[tokio::test]
    async fn drain_waits_for_tracked_tasks() {
        let signal = ShutdownSignal::new();
        let finished = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&finished);
        signal.spawn(async move {
            tokio::task::yield_now().await;
            flag.store(true, Ordering::SeqCst);
        });

        signal.close();
        signal.drained().await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancellation_is_observable() {
        let signal = ShutdownSignal::new();
        assert!(!signal.is_cancelled());
        signal.cancel();
        signal.cancelled().await;
        assert!(signal.is_cancelled());
    }
}
