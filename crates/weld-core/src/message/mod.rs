//! Immutable request/response value types.
//!
//! The message model is pure value construction and accessors; no I/O
//! happens here. Transport adapters build [`Request`]s from wire bytes
//! and serialize [`Response`]s back out.

pub mod headers;
pub mod query;
pub mod request;
pub mod response;
pub mod status;

pub use headers::HeaderMap;
pub use query::QueryMap;
pub use request::{Request, RequestBuilder};
pub use response::{Response, ResponseBuilder};
pub use status::StatusCode;
