//! # Weld
//!
//! An asynchronous, transport-agnostic HTTP request-processing pipeline.
//!
//! ## Overview
//!
//! Weld composes an application from four stages wired into one
//! pipeline, then serves that pipeline over an interchangeable
//! transport:
//!
//! ```text
//! ┌───────────┐    ┌────────┐    ┌───────────┐    ┌──────────┐    ┌───────┐
//! │ Transport │───▶│ before │───▶│ responder │───▶│ recovery │───▶│ after │
//! │ (adapter) │    │ filter │    │ (router)  │    │ (on err) │    │ filter│
//! └───────────┘    └────────┘    └───────────┘    └──────────┘    └───────┘
//! ```
//!
//! - **Transport**: a raw event-socket HTTP server, or a netstring
//!   queue worker attached to a broker
//! - **Before filter**: transforms every request ahead of routing
//! - **Responder**: an ordered first-match-wins router of extractors
//! - **Recovery**: per-error-kind clauses plus a mandatory fallback,
//!   applied exactly once
//! - **After filter**: transforms every response; its failure abandons
//!   that one request
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use weld::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> HostResult<()> {
//!     let mut host = Host::new();
//!
//!     host.register_router(
//!         Router::new()
//!             .route(get().and(path("/greet")), |req: Request, _| async move {
//!                 let name = req.query().first("name").unwrap_or("world").to_string();
//!                 Ok(Response::text(format!("hello, {name}")))
//!             })
//!             .fallback(|_req| async { Ok(Response::empty(StatusCode::NotFound)) }),
//!     );
//!
//!     host.run().await
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` (default): TOML configuration files (`weld.toml`)
//! - `json-log`: newline-delimited JSON log output

pub use weld_core as core;
pub use weld_framework as framework;
pub use weld_runtime as runtime;
pub use weld_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use weld::prelude::*;
/// ```
pub mod prelude {
    // Host - main entry point
    pub use weld_runtime::error::{HostError, HostResult};
    pub use weld_runtime::host::Host;
    pub use weld_runtime::shutdown::Phase;

    // Message model
    pub use weld_core::{
        ConnectionIdentity, HeaderMap, PipelineError, PipelineResult, QueryMap, Request,
        Response, StatusCode,
    };

    // Routing and pipeline assembly
    pub use weld_framework::extract::{
        delete, get, method, path, path_prefix, post, put, query, segments,
    };
    pub use weld_framework::{Extract, ExtractExt, Pipeline, PipelineBuilder, Router};

    // Logging macros
    pub use weld_runtime::tracing::{debug, error, info, instrument, trace, warn};
}
