//! Shutdown coordination.
//!
//! The coordinator owns the host's lifecycle phase and runs shutdown in
//! a fixed order: before-shutdown hooks, then cancellation of the
//! transports, then a bounded drain of in-flight requests, then
//! after-shutdown hooks. Hooks run sequentially in registration order.
//!
//! Shutdown is terminal. A second call observes a non-running phase and
//! returns immediately.

use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::{info, warn};

use weld_transport::ShutdownSignal;

type Hook = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

/// Host lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accepting and processing requests.
    Running,
    /// Shutdown requested; in-flight requests are finishing.
    Draining,
    /// Fully stopped. Terminal.
    Stopped,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        })
    }
}

/// Coordinates ordered shutdown of the host.
pub struct ShutdownCoordinator {
    phase: Mutex<Phase>,
    before: Mutex<Vec<Hook>>,
    after: Mutex<Vec<Hook>>,
    signal: ShutdownSignal,
    drain_timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(signal: ShutdownSignal, drain_timeout: Duration) -> Self {
        Self {
            phase: Mutex::new(Phase::Running),
            before: Mutex::new(Vec::new()),
            after: Mutex::new(Vec::new()),
            signal,
            drain_timeout,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        *self.phase.lock()
    }

    /// Registers a hook to run before the transports stop accepting
    /// work. Hooks run sequentially in registration order.
    pub fn on_before_shutdown<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.before.lock().push(Box::new(move || Box::pin(f())));
    }

    /// Registers a hook to run after the drain completes (or is
    /// abandoned). Hooks run sequentially in registration order.
    pub fn on_after_shutdown<F, Fut>(&self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.after.lock().push(Box::new(move || Box::pin(f())));
    }

    /// Runs the shutdown sequence. Only the first call does anything.
    pub async fn shutdown(&self) {
        {
            let mut phase = self.phase.lock();
            if *phase != Phase::Running {
                warn!(phase = %phase, "shutdown already in progress");
                return;
            }
            *phase = Phase::Draining;
        }
        info!("shutting down");

        let before = std::mem::take(&mut *self.before.lock());
        for hook in before {
            hook().await;
        }

        self.signal.cancel();
        self.signal.close();

        match tokio::time::timeout(self.drain_timeout, self.signal.drained()).await {
            Ok(()) => info!("in-flight requests drained"),
            Err(_) => warn!(
                timeout_ms = self.drain_timeout.as_millis() as u64,
                "drain timed out, abandoning in-flight requests"
            ),
        }

        let after = std::mem::take(&mut *self.after.lock());
        for hook in after {
            hook().await;
        }

        *self.phase.lock() = Phase::Stopped;
        info!("stopped");
    }
}
