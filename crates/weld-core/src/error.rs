//! Unified error types for the Weld core model.
//!
//! The taxonomy mirrors the boundaries of the system: decode errors stay
//! inside the transport adapters, pipeline errors are given exactly one
//! recovery attempt, and message errors reject invalid values at
//! construction time.

use std::time::Duration;

use thiserror::Error;

// =============================================================================
// Message Errors
// =============================================================================

/// Errors raised while constructing message model values.
#[derive(Debug, Clone, Error)]
pub enum MessageError {
    /// Numeric status code outside the recognized table.
    #[error("unrecognized status code: {0}")]
    InvalidStatus(u16),
}

// =============================================================================
// Decode Errors
// =============================================================================

/// Errors raised while decoding inbound bytes or envelopes.
///
/// A decode error never reaches the pipeline: the event-socket adapter
/// answers with a 400-class response directly, and the queue-worker
/// adapter drops the envelope (no valid connection identity means no
/// response is possible).
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// Malformed HTTP request line.
    #[error("malformed request line: {0}")]
    RequestLine(String),

    /// Malformed header line.
    #[error("malformed header: {0}")]
    Header(String),

    /// Invalid or conflicting body framing.
    #[error("invalid body framing: {0}")]
    Framing(String),

    /// Malformed netstring frame.
    #[error("malformed netstring: {0}")]
    Netstring(String),

    /// Malformed queue envelope.
    #[error("malformed envelope: {0}")]
    Envelope(String),

    /// Frame exceeds the configured size limit.
    #[error("frame of {len} bytes exceeds limit of {limit} bytes")]
    TooLarge {
        /// Declared frame length.
        len: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// Peer closed the connection mid-message.
    #[error("connection closed mid-message")]
    UnexpectedEof,
}

// =============================================================================
// Pipeline Errors
// =============================================================================

/// Error kind used for pipeline timeouts.
pub const TIMEOUT_KIND: &str = "timeout";

/// A failure raised by the before filter or the responder.
///
/// Every pipeline error carries an identifying `kind` that recovery
/// clauses are matched against. Before-filter failures and responder
/// failures are intentionally indistinguishable: both take the same
/// single recovery attempt.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct PipelineError {
    kind: String,
    message: String,
}

impl PipelineError {
    /// Creates a pipeline error with the given kind and message.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Creates a pipeline error for an exceeded deadline.
    pub fn timeout(deadline: Duration) -> Self {
        Self::new(
            TIMEOUT_KIND,
            format!("pipeline exceeded deadline of {deadline:?}"),
        )
    }

    /// Returns the identifying kind of this error.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur in transport adapter operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Failed to bind the listening socket.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Address that could not be bound.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to connect to the broker.
    #[error("failed to connect to broker at {addr}: {source}")]
    BrokerConnect {
        /// Broker address.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Broker connection closed unexpectedly.
    #[error("broker connection closed: {0}")]
    BrokerClosed(String),

    /// Unrecoverable wire-protocol violation on a broker stream.
    #[error("protocol error: {0}")]
    Protocol(#[from] DecodeError),

    /// I/O error on an established connection.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for message construction.
pub type MessageResult<T> = Result<T, MessageError>;

/// Result type for wire decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for pipeline stages.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_error_exposes_kind() {
        let err = PipelineError::new("NotFoundException", "no such user");
        assert_eq!(err.kind(), "NotFoundException");
        assert_eq!(err.message(), "no such user");
    }

    #[test]
    fn timeout_error_uses_reserved_kind() {
        let err = PipelineError::timeout(Duration::from_secs(5));
        assert_eq!(err.kind(), TIMEOUT_KIND);
    }
}
