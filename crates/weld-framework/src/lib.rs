//! # Weld Framework
//!
//! The request-processing layer of Weld: route extractors that decompose
//! a [`Request`](weld_core::Request) into method, path and query
//! bindings, an ordered first-match-wins [`Router`], and the
//! [`Pipeline`] combinator that composes the before filter, responder,
//! error recovery and after filter into one asynchronous function from
//! request to response.
//!
//! # Pipeline execution order
//!
//! 1. `before` transforms the request (async; failures take the same
//!    recovery path as responder failures).
//! 2. `responder` produces the response (async).
//! 3. On failure, recovery is attempted exactly once: the clause
//!    registered for the error kind, or the mandatory fallback.
//! 4. `after` transforms whichever response resulted. It always runs,
//!    is not protected by recovery, and its failure is fatal to that
//!    one request.
//!
//! Exactly one response is produced per request.
//!
//! # Example
//!
//! ```rust,ignore
//! use weld_framework::{Pipeline, Router, extract::{get, path}};
//! use weld_core::{Response, StatusCode};
//!
//! let router = Router::new()
//!     .route(get().and(path("/example")), |_req, _| async {
//!         Ok(Response::text("hello"))
//!     })
//!     .fallback(|_req| async { Ok(Response::empty(StatusCode::NotFound)) });
//!
//! let pipeline = Pipeline::builder()
//!     .router(router)
//!     .recover_fallback(|_req, _err| Response::internal_error())
//!     .build()?;
//! ```

pub mod error;
pub mod extract;
pub mod pipeline;
pub mod router;

pub use error::{AfterFilterError, PipelineBuildError};
pub use extract::{Extract, ExtractExt};
pub use pipeline::{BoxFuture, Pipeline, PipelineBuilder};
pub use router::{Router, RouterBuilder};
