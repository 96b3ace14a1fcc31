//! Host orchestration.
//!
//! The [`Host`] ties everything together: it loads configuration, owns
//! the pipeline under assembly, selects the transport binding, and
//! coordinates shutdown through a [`ShutdownCoordinator`].
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use weld_runtime::Host;
//!
//! // Auto-loads config from weld.toml in the current directory
//! let mut host = Host::new();
//!
//! host.register_router(
//!     Router::new()
//!         .route(get().and(path("/health")), |_req, _| async {
//!             Ok(Response::text("ok"))
//!         })
//!         .fallback(|_req| async { Ok(Response::empty(StatusCode::NotFound)) }),
//! );
//!
//! host.run().await?;
//! ```

use std::sync::Arc;

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{error, info};

use weld_core::{PipelineError, PipelineResult, Request, Response, TransportResult};
use weld_framework::{Pipeline, PipelineBuilder, Router};
use weld_transport::http::{EventSocketConfig, EventSocketServer};
use weld_transport::queue::{QueueWorker, QueueWorkerConfig};
use weld_transport::{ShutdownSignal, Transport};

use crate::config::{ConfigLoader, TransportConfig, WeldConfig};
use crate::error::{HostError, HostResult};
use crate::logging;
use crate::shutdown::{Phase, ShutdownCoordinator};

/// The host process: pipeline assembly, transport binding, lifecycle.
pub struct Host {
    config: WeldConfig,
    builder: Option<PipelineBuilder>,
    has_fallback: bool,
    signal: ShutdownSignal,
    coordinator: Arc<ShutdownCoordinator>,
    transport_task: Option<JoinHandle<TransportResult<()>>>,
}

impl Host {
    /// Creates a host with automatic configuration loading.
    ///
    /// Searches for `weld.toml` in the current directory and falls back
    /// to defaults if nothing is found.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                WeldConfig::default()
            });

        Self::from_config(config)
    }

    /// Creates a host from a loaded configuration.
    ///
    /// Initializes logging from the configuration; `try_init` semantics
    /// make that harmless if a subscriber is already installed.
    pub fn from_config(config: WeldConfig) -> Self {
        logging::init_from_config(&config.logging);

        let signal = ShutdownSignal::new();
        let coordinator = Arc::new(ShutdownCoordinator::new(
            signal.clone(),
            config.shutdown.drain_timeout(),
        ));

        info!(
            log_level = %config.logging.level,
            timeout_ms = config.pipeline.timeout_ms,
            "host initialized from configuration"
        );

        let builder = PipelineBuilder::new().timeout(config.pipeline.timeout());
        Self {
            config,
            builder: Some(builder),
            has_fallback: false,
            signal,
            coordinator,
            transport_task: None,
        }
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &WeldConfig {
        &self.config
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.coordinator.phase()
    }

    // =========================================================================
    // Pipeline assembly
    // =========================================================================

    fn with_builder(&mut self, f: impl FnOnce(PipelineBuilder) -> PipelineBuilder) {
        if let Some(builder) = self.builder.take() {
            self.builder = Some(f(builder));
        }
    }

    /// Registers the before filter, run on every request ahead of the
    /// responder.
    pub fn register_before<F, Fut>(&mut self, f: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PipelineResult<Request>> + Send + 'static,
    {
        self.with_builder(|b| b.before(f));
    }

    /// Registers the responder.
    pub fn register_responder<F, Fut>(&mut self, f: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PipelineResult<Response>> + Send + 'static,
    {
        self.with_builder(|b| b.responder(f));
    }

    /// Registers a [`Router`] as the responder.
    pub fn register_router(&mut self, router: Router) {
        self.with_builder(|b| b.router(router));
    }

    /// Registers a recovery clause for one error kind.
    pub fn register_error_recovery<F>(&mut self, kind: impl Into<String>, f: F)
    where
        F: Fn(&Request, &PipelineError) -> Response + Send + Sync + 'static,
    {
        self.with_builder(|b| b.recover(kind, f));
    }

    /// Registers the recovery fallback clause.
    ///
    /// If the application never registers one, the host installs an
    /// opaque 500 fallback at start so unrecovered failures leak
    /// nothing.
    pub fn register_error_fallback<F>(&mut self, f: F)
    where
        F: Fn(&Request, &PipelineError) -> Response + Send + Sync + 'static,
    {
        self.has_fallback = true;
        self.with_builder(|b| b.recover_fallback(f));
    }

    /// Registers the after filter, run on every composed response.
    pub fn register_after<F, Fut>(&mut self, f: F)
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PipelineResult<Response>> + Send + 'static,
    {
        self.with_builder(|b| b.after(f));
    }

    // =========================================================================
    // Shutdown hooks
    // =========================================================================

    /// Registers a hook to run before the transport stops accepting
    /// requests.
    pub fn register_before_shutdown<F, Fut>(&mut self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.coordinator.on_before_shutdown(f);
    }

    /// Registers a hook to run after in-flight requests have drained.
    pub fn register_after_shutdown<F, Fut>(&mut self, f: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.coordinator.on_after_shutdown(f);
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Builds the pipeline from everything registered so far.
    fn build_pipeline(&mut self) -> HostResult<Arc<Pipeline>> {
        let mut builder = self.builder.take().ok_or(HostError::AlreadyStarted)?;
        if !self.has_fallback {
            builder = builder.recover_fallback(|_req, _err| Response::internal_error());
        }
        Ok(Arc::new(builder.build()?))
    }

    /// Constructs the configured transport over the given pipeline.
    async fn bind_transport(&self, pipeline: Arc<Pipeline>) -> HostResult<Box<dyn Transport>> {
        match self
            .config
            .transport
            .as_ref()
            .ok_or(HostError::MissingTransport)?
        {
            TransportConfig::EventSocket { host, port } => {
                let config = EventSocketConfig {
                    host: host.clone(),
                    port: *port,
                };
                let server = EventSocketServer::bind(&config, pipeline).await?;
                Ok(Box::new(server))
            }
            TransportConfig::QueueWorker {
                recv_addr,
                send_addr,
                identity,
            } => {
                let config = QueueWorkerConfig {
                    recv_addr: recv_addr.clone(),
                    send_addr: send_addr.clone(),
                    identity: identity.clone(),
                };
                Ok(Box::new(QueueWorker::new(config, pipeline)))
            }
        }
    }

    /// Assembles the pipeline and starts serving on the configured
    /// transport.
    pub async fn start(&mut self) -> HostResult<()> {
        if self.transport_task.is_some() {
            return Err(HostError::AlreadyStarted);
        }

        let pipeline = self.build_pipeline()?;
        let transport = self.bind_transport(pipeline).await?;
        let shutdown = self.signal.clone();

        self.transport_task = Some(tokio::spawn(async move {
            transport.serve(shutdown).await
        }));
        info!("host started");
        Ok(())
    }

    /// Runs the shutdown sequence and waits for the transport to stop.
    pub async fn shutdown(&mut self) -> HostResult<()> {
        let task = self.transport_task.take().ok_or(HostError::NotStarted)?;

        self.coordinator.shutdown().await;

        match task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                error!(error = %err, "transport stopped with error");
                Err(err.into())
            }
            Err(join_err) => {
                error!(error = %join_err, "transport task panicked");
                Ok(())
            }
        }
    }

    /// Starts the host and runs it until a shutdown signal arrives.
    pub async fn run(&mut self) -> HostResult<()> {
        self.start().await?;

        info!("host is now running, press Ctrl+C to stop");
        wait_for_shutdown().await;

        self.shutdown().await
    }
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

/// Waits for shutdown signals (Ctrl+C or SIGTERM).
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(err) => {
                error!(error = %err, "failed to register SIGTERM handler");
                return;
            }
        };

        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down");
        }
    }
}

#[cfg(test)]
mod tests {
    use weld_core::StatusCode;
    use weld_framework::ExtractExt;
    use weld_framework::extract::{get, path};

    use super::*;

    fn event_socket_host(port: u16) -> Host {
        let mut config = WeldConfig::default();
        config.transport = Some(TransportConfig::EventSocket {
            host: "127.0.0.1".to_string(),
            port,
        });
        Host::from_config(config)
    }

    fn health_router() -> Router {
        Router::new()
            .route(get().and(path("/health")), |_req, _| async {
                Ok(Response::text("ok"))
            })
            .fallback(|_req| async { Ok(Response::empty(StatusCode::NotFound)) })
    }

    #[tokio::test]
    async fn start_and_shutdown_round_trip() {
        let mut host = event_socket_host(0);
        host.register_router(health_router());

        host.start().await.unwrap();
        assert_eq!(host.phase(), Phase::Running);

        host.shutdown().await.unwrap();
        assert_eq!(host.phase(), Phase::Stopped);
    }

    #[tokio::test]
    async fn missing_transport_is_an_error() {
        let mut host = Host::from_config(WeldConfig::default());
        host.register_router(health_router());

        assert!(matches!(
            host.start().await,
            Err(HostError::MissingTransport)
        ));
    }

    #[tokio::test]
    async fn missing_responder_is_rejected_at_start() {
        let mut host = event_socket_host(0);
        assert!(matches!(host.start().await, Err(HostError::Pipeline(_))));
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let mut host = event_socket_host(0);
        host.register_router(health_router());

        host.start().await.unwrap();
        assert!(matches!(
            host.start().await,
            Err(HostError::AlreadyStarted)
        ));
        host.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_before_start_is_rejected() {
        let mut host = event_socket_host(0);
        assert!(matches!(
            host.shutdown().await,
            Err(HostError::NotStarted)
        ));
    }

    #[tokio::test]
    async fn shutdown_hooks_run_around_the_drain() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let mut host = event_socket_host(0);
        host.register_router(health_router());

        let order = Arc::new(AtomicUsize::new(0));
        let before_saw = Arc::new(AtomicUsize::new(usize::MAX));
        let after_saw = Arc::new(AtomicUsize::new(usize::MAX));

        let (o, slot) = (Arc::clone(&order), Arc::clone(&before_saw));
        host.register_before_shutdown(move || async move {
            slot.store(o.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
        });
        let (o, slot) = (Arc::clone(&order), Arc::clone(&after_saw));
        host.register_after_shutdown(move || async move {
            slot.store(o.fetch_add(1, Ordering::SeqCst), Ordering::SeqCst);
        });

        host.start().await.unwrap();
        host.shutdown().await.unwrap();

        assert_eq!(before_saw.load(Ordering::SeqCst), 0);
        assert_eq!(after_saw.load(Ordering::SeqCst), 1);
    }
}
