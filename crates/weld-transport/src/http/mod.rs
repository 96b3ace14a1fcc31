//! Event-socket transport: raw HTTP/1.x over TCP.
//!
//! Parsing and serialization of the wire bytes live here, not in the
//! pipeline: the adapter turns each readable unit of data into exactly
//! one [`Request`](weld_core::Request) and writes the resulting
//! [`Response`](weld_core::Response) back on the same connection.

pub mod parse;
pub mod server;
pub mod wire;

pub use server::{EventSocketConfig, EventSocketServer};
