//! Weld Runtime - Host orchestration layer for the Weld pipeline.
//!
//! This crate provides:
//! - The [`Host`]: pipeline assembly, transport binding, lifecycle
//! - Figment-based configuration loading (`config`)
//! - Ordered shutdown with bounded drain (`shutdown`)
//! - Logging configuration (`logging`)
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use weld_runtime::Host;
//!
//! #[tokio::main]
//! async fn main() -> weld_runtime::HostResult<()> {
//!     // Auto-loads weld.toml from the current directory
//!     let mut host = Host::new();
//!
//!     host.register_router(my_router());
//!     host.register_error_recovery("NotFound", |_req, _err| {
//!         Response::empty(StatusCode::NotFound)
//!     });
//!
//!     // Runs until Ctrl+C or SIGTERM
//!     host.run().await
//! }
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod logging;
pub mod shutdown;

// Re-exports
pub use config::{ConfigError, ConfigLoader, ConfigResult, TransportConfig, WeldConfig};
pub use error::{HostError, HostResult};
pub use host::Host;
pub use logging::{LoggingBuilder, SpanEvents};
pub use shutdown::{Phase, ShutdownCoordinator};

// Re-export tracing for use by applications
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// Provides the commonly used logging macros alongside the host types.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};

    pub use super::config::{ConfigLoader, WeldConfig};
    pub use super::host::Host;
    pub use super::shutdown::Phase;
}
