//! Framework error types.

use thiserror::Error;

use weld_core::PipelineError;

/// Errors raised while assembling a [`Pipeline`](crate::Pipeline).
#[derive(Debug, Error)]
pub enum PipelineBuildError {
    /// No responder (or router) was supplied.
    #[error("pipeline has no responder")]
    MissingResponder,

    /// No recovery fallback clause was supplied.
    ///
    /// The fallback is mandatory: it is what turns an unrecovered
    /// failure into a response instead of a propagated fault.
    #[error("pipeline has no recovery fallback clause")]
    MissingRecoveryFallback,
}

/// A failure inside the after filter.
///
/// The after stage runs past the recovery point, so its failure cannot
/// be recovered; it is fatal to the one in-flight request. The transport
/// adapter must still deliver a hardcoded minimal server-error response
/// to avoid leaking a hung connection.
#[derive(Debug, Clone, Error)]
#[error("after filter failed: {source}")]
pub struct AfterFilterError {
    #[source]
    source: PipelineError,
}

impl AfterFilterError {
    /// Wraps the underlying stage failure.
    pub fn new(source: PipelineError) -> Self {
        Self { source }
    }

    /// The failure raised inside the after filter.
    pub fn inner(&self) -> &PipelineError {
        &self.source
    }
}
