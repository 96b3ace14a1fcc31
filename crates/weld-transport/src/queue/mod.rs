//! Queue-worker transport: netstring-framed envelopes over a broker.
//!
//! The worker holds two persistent connections to a lightweight broker:
//! one delivering request envelopes, one accepting response envelopes.
//! Envelopes are sequences of netstring frames (`<len>:<payload>,`);
//! the request side carries sender identity, connection identity, path,
//! a JSON header block and the body.

pub mod codec;
pub mod envelope;
pub mod worker;

pub use envelope::{Envelope, RequestEnvelope, ResponseEnvelope};
pub use worker::{QueueWorker, QueueWorkerConfig};
