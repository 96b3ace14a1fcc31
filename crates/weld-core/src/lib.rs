//! # Weld Core
//!
//! Foundation types for the Weld request-processing pipeline.
//!
//! This crate provides the immutable message model shared by every layer
//! of Weld: requests, responses, headers, query parameters and the status
//! code vocabulary, plus the error taxonomy that the pipeline and the
//! transport adapters agree on.
//!
//! # Design
//!
//! - [`Request`] and [`Response`] are immutable values. Filters never
//!   mutate a request in place; they build a new one from the old via
//!   [`Request::into_builder`].
//! - [`StatusCode`] is a closed set. Constructing a status from an
//!   unrecognized numeric code fails with [`MessageError::InvalidStatus`]
//!   instead of silently passing unknown codes downstream.
//! - [`ConnectionIdentity`] is the opaque token a transport adapter uses
//!   to route a finished [`Response`] back to the socket or worker slot
//!   its [`Request`] arrived on.
//!
//! # Example
//!
//! ```rust,ignore
//! use weld_core::{Request, Response, StatusCode};
//!
//! let request = Request::builder()
//!     .method("get")
//!     .uri("/greet?name=weld")
//!     .build();
//!
//! assert_eq!(request.method(), "GET");
//! assert_eq!(request.query().first("name"), Some("weld"));
//!
//! let response = Response::builder(StatusCode::Ok)
//!     .header("Content-Type", "text/plain")
//!     .body("hello")
//!     .build();
//! ```

pub mod error;
pub mod identity;
pub mod message;

pub use error::{
    DecodeError, DecodeResult, MessageError, MessageResult, PipelineError, PipelineResult,
    TransportError, TransportResult,
};
pub use identity::ConnectionIdentity;
pub use message::{
    HeaderMap, QueryMap, Request, RequestBuilder, Response, ResponseBuilder, StatusCode,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::error::{DecodeError, PipelineError, PipelineResult};
    pub use super::identity::ConnectionIdentity;
    pub use super::message::{
        HeaderMap, QueryMap, Request, Response, ResponseBuilder, StatusCode,
    };
}
