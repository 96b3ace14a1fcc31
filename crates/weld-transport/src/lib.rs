//! # Weld Transport
//!
//! Wire transport adapters for the Weld pipeline.
//!
//! Two interchangeable adapters translate between raw bytes and the
//! [`weld_core`] message model:
//!
//! - [`http::EventSocketServer`] — owns a listening socket, parses
//!   HTTP/1.x requests itself (request line, headers, Content-Length or
//!   chunked bodies) and serializes responses back on the originating
//!   connection, one lightweight task per connection.
//! - [`queue::QueueWorker`] — speaks a netstring-framed envelope
//!   protocol over two persistent broker connections, reconstructing
//!   requests from envelopes and addressing responses back to the
//!   (sender, connection) pair they arrived from.
//!
//! Both adapters take a [`ShutdownSignal`]: on cancellation they stop
//! accepting new inbound work while in-flight pipeline invocations
//! finish under the signal's task tracker.

pub mod http;
pub mod queue;
pub mod signal;

use async_trait::async_trait;

use weld_core::TransportResult;

pub use signal::ShutdownSignal;

/// A transport adapter that can serve a pipeline until shut down.
///
/// Exactly one transport is active per process instance; the runtime
/// selects it from configuration.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Serves until the shutdown signal is cancelled or a fatal
    /// transport error occurs.
    async fn serve(self: Box<Self>, shutdown: ShutdownSignal) -> TransportResult<()>;
}
