//! Host error types.

use thiserror::Error;

use weld_core::TransportError;
use weld_framework::PipelineBuildError;

use crate::config::ConfigError;

/// Errors that can occur while assembling or running the host.
#[derive(Error, Debug)]
pub enum HostError {
    /// Configuration loading or validation failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline assembly failed.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineBuildError),

    /// Transport failure.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// No transport binding configured.
    #[error("No transport configured; set [transport] in the configuration")]
    MissingTransport,

    /// The host was started twice.
    #[error("Host is already started")]
    AlreadyStarted,

    /// An operation that requires a started host was called first.
    #[error("Host is not started")]
    NotStarted,
}

/// Result type for host operations.
pub type HostResult<T> = Result<T, HostError>;
