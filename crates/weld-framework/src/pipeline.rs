//! The pipeline combinator.
//!
//! A [`Pipeline`] is a composed function value from request to response,
//! built once at application start from four user-supplied parts and
//! concurrently invoked by many in-flight requests. Every stage is
//! asynchronous-capable: a suspended stage yields its worker thread back
//! to the scheduler instead of blocking it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use weld_core::{PipelineError, PipelineResult, Request, Response};

use crate::error::{AfterFilterError, PipelineBuildError};
use crate::router::Router;

/// Boxed future used for type-erased pipeline stages.
pub use futures::future::BoxFuture;

type BeforeFilter =
    Arc<dyn Fn(Request) -> BoxFuture<'static, PipelineResult<Request>> + Send + Sync>;
type Responder =
    Arc<dyn Fn(Request) -> BoxFuture<'static, PipelineResult<Response>> + Send + Sync>;
type RecoveryClause = Arc<dyn Fn(&Request, &PipelineError) -> Response + Send + Sync>;
type AfterFilter =
    Arc<dyn Fn(Response) -> BoxFuture<'static, PipelineResult<Response>> + Send + Sync>;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// =============================================================================
// Pipeline
// =============================================================================

/// The composed before/responder/recovery/after function applied to
/// every request.
///
/// Immutable after construction; share it with `Arc` and invoke it from
/// any number of concurrent tasks.
pub struct Pipeline {
    before: BeforeFilter,
    responder: Responder,
    recovery: Recovery,
    after: AfterFilter,
    timeout: Duration,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Starts building a pipeline.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Runs one request through the pipeline.
    ///
    /// Guarantees of this ordering:
    /// - exactly one response per request,
    /// - the after filter always observes a valid response, even when
    ///   the responder failed,
    /// - recovery is attempted at most once per request.
    ///
    /// `Err` means the after filter itself failed; the caller must still
    /// deliver a hardcoded minimal server-error response.
    pub async fn handle(&self, request: Request) -> Result<Response, AfterFilterError> {
        // Recovery clauses see the request as it arrived, before any
        // filtering, so keep a handle on it while the stages consume
        // their own copy.
        let original = request.clone();

        let before = Arc::clone(&self.before);
        let responder = Arc::clone(&self.responder);
        let attempt = async move {
            let request = before(request).await?;
            responder(request).await
        };

        let response = match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                debug!(kind = err.kind(), identity = %original.identity(), "recovering failed request");
                self.recovery.recover(&original, &err)
            }
            Err(_) => {
                warn!(identity = %original.identity(), timeout = ?self.timeout, "pipeline deadline exceeded");
                let err = PipelineError::timeout(self.timeout);
                self.recovery.recover(&original, &err)
            }
        };

        (self.after)(response).await.map_err(AfterFilterError::new)
    }

    /// The configured end-to-end deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

// =============================================================================
// Recovery
// =============================================================================

/// Typed error recovery: per-kind clauses plus the mandatory fallback.
struct Recovery {
    clauses: HashMap<String, RecoveryClause>,
    fallback: RecoveryClause,
}

impl Recovery {
    fn recover(&self, request: &Request, err: &PipelineError) -> Response {
        match self.clauses.get(err.kind()) {
            Some(clause) => clause(request, err),
            None => (self.fallback)(request, err),
        }
    }
}

// =============================================================================
// PipelineBuilder
// =============================================================================

/// Builder for [`Pipeline`].
///
/// The responder (or a [`Router`]) and the recovery fallback clause are
/// required; [`PipelineBuilder::build`] rejects a pipeline without
/// them. Before and after filters default to the identity.
pub struct PipelineBuilder {
    before: Option<BeforeFilter>,
    responder: Option<Responder>,
    clauses: HashMap<String, RecoveryClause>,
    fallback: Option<RecoveryClause>,
    after: Option<AfterFilter>,
    timeout: Duration,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    /// Creates a builder with identity filters and a 30 second deadline.
    pub fn new() -> Self {
        Self {
            before: None,
            responder: None,
            clauses: HashMap::new(),
            fallback: None,
            after: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets the asynchronous before filter.
    ///
    /// A failure here takes the same recovery path as a responder
    /// failure; the two are deliberately indistinguishable.
    pub fn before<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PipelineResult<Request>> + Send + 'static,
    {
        self.before = Some(Arc::new(move |req| Box::pin(f(req))));
        self
    }

    /// Sets the asynchronous responder.
    pub fn responder<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PipelineResult<Response>> + Send + 'static,
    {
        self.responder = Some(Arc::new(move |req| Box::pin(f(req))));
        self
    }

    /// Uses a [`Router`] as the responder.
    pub fn router(mut self, router: Router) -> Self {
        let router = Arc::new(router);
        self.responder = Some(Arc::new(move |req| {
            let router = Arc::clone(&router);
            Box::pin(async move { router.dispatch(req).await })
        }));
        self
    }

    /// Registers a recovery clause for one error kind.
    pub fn recover<F>(mut self, kind: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Request, &PipelineError) -> Response + Send + Sync + 'static,
    {
        self.clauses.insert(kind.into(), Arc::new(f));
        self
    }

    /// Registers the mandatory fallback clause, used when no per-kind
    /// clause matches.
    pub fn recover_fallback<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request, &PipelineError) -> Response + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(f));
        self
    }

    /// Sets the asynchronous after filter.
    ///
    /// The after filter always runs, even on a recovered response, and
    /// is not protected by recovery.
    pub fn after<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Response) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PipelineResult<Response>> + Send + 'static,
    {
        self.after = Some(Arc::new(move |resp| Box::pin(f(resp))));
        self
    }

    /// Sets the end-to-end deadline for the before + responder stages.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Assembles the pipeline.
    pub fn build(self) -> Result<Pipeline, PipelineBuildError> {
        let responder = self.responder.ok_or(PipelineBuildError::MissingResponder)?;
        let fallback = self
            .fallback
            .ok_or(PipelineBuildError::MissingRecoveryFallback)?;

        Ok(Pipeline {
            before: self
                .before
                .unwrap_or_else(|| Arc::new(|req| Box::pin(async move { Ok(req) }))),
            responder,
            recovery: Recovery {
                clauses: self.clauses,
                fallback,
            },
            after: self
                .after
                .unwrap_or_else(|| Arc::new(|resp| Box::pin(async move { Ok(resp) }))),
            timeout: self.timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use weld_core::StatusCode;

    use super::*;
    use crate::extract::{get, path, ExtractExt};

    fn request(method: &str, uri: &str) -> Request {
        Request::builder().method(method).uri(uri).build()
    }

    fn example_pipeline() -> PipelineBuilder {
        let router = Router::new()
            .route(get().and(path("/example")), |_req, _| async {
                Ok(Response::text("hello"))
            })
            .fallback(|_req| async { Ok(Response::empty(StatusCode::NotFound)) });

        Pipeline::builder()
            .router(router)
            .recover_fallback(|_req, _err| Response::internal_error())
    }

    #[tokio::test]
    async fn matched_route_yields_declared_response() {
        let pipeline = example_pipeline().build().unwrap();

        let response = pipeline.handle(request("GET", "/example")).await.unwrap();
        assert_eq!(response.status(), StatusCode::Ok);
        assert_eq!(response.body().as_ref(), b"hello");
    }

    #[tokio::test]
    async fn unmatched_route_takes_the_fallback_clause() {
        let pipeline = example_pipeline().build().unwrap();

        let response = pipeline
            .handle(request("POST", "/unknown-path"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn replay_of_identical_request_is_idempotent() {
        let pipeline = example_pipeline().build().unwrap();
        let req = request("GET", "/example");

        let first = pipeline.handle(req.clone()).await.unwrap();
        let second = pipeline.handle(req).await.unwrap();
        assert_eq!(first.status(), second.status());
        assert_eq!(first.body(), second.body());
    }

    #[tokio::test]
    async fn declared_recovery_clause_handles_its_kind() {
        let pipeline = Pipeline::builder()
            .responder(|_req| async {
                Err(PipelineError::new("NotFoundException", "missing"))
            })
            .recover("NotFoundException", |_req, _err| {
                Response::empty(StatusCode::NotFound)
            })
            .recover_fallback(|_req, _err| Response::internal_error())
            .build()
            .unwrap();

        let response = pipeline.handle(request("GET", "/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn unrecovered_error_becomes_opaque_500() {
        let pipeline = Pipeline::builder()
            .responder(|_req| async {
                Err(PipelineError::new("DatabaseException", "secret detail"))
            })
            .recover("NotFoundException", |_req, _err| {
                Response::empty(StatusCode::NotFound)
            })
            .recover_fallback(|_req, _err| Response::internal_error())
            .build()
            .unwrap();

        let response = pipeline.handle(request("GET", "/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::InternalServerError);
        assert!(!String::from_utf8_lossy(response.body()).contains("secret"));
    }

    #[tokio::test]
    async fn before_failure_takes_the_responder_recovery_path() {
        let responder_ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&responder_ran);

        let pipeline = Pipeline::builder()
            .before(|_req| async { Err(PipelineError::new("AuthException", "denied")) })
            .responder(move |_req| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(Response::text("unreachable")) }
            })
            .recover("AuthException", |_req, _err| {
                Response::empty(StatusCode::Unauthorized)
            })
            .recover_fallback(|_req, _err| Response::internal_error())
            .build()
            .unwrap();

        let response = pipeline.handle(request("GET", "/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::Unauthorized);
        assert_eq!(responder_ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn after_runs_exactly_once_even_after_recovery() {
        let after_runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&after_runs);

        let pipeline = Pipeline::builder()
            .responder(|_req| async { Err(PipelineError::new("Boom", "boom")) })
            .recover_fallback(|_req, _err| Response::internal_error())
            .after(move |resp| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move { Ok(resp.into_builder().header("X-After", "yes").build()) }
            })
            .build()
            .unwrap();

        let response = pipeline.handle(request("GET", "/")).await.unwrap();
        assert_eq!(response.headers().get("x-after"), Some("yes"));
        assert_eq!(after_runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn after_failure_is_fatal_to_the_request() {
        let pipeline = Pipeline::builder()
            .responder(|_req| async { Ok(Response::text("ok")) })
            .recover_fallback(|_req, _err| Response::internal_error())
            .after(|_resp| async { Err(PipelineError::new("AfterBoom", "boom")) })
            .build()
            .unwrap();

        let err = pipeline.handle(request("GET", "/")).await.unwrap_err();
        assert_eq!(err.inner().kind(), "AfterBoom");
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_routed_through_recovery() {
        let pipeline = Pipeline::builder()
            .responder(|_req| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(Response::text("late"))
            })
            .recover(weld_core::error::TIMEOUT_KIND, |_req, _err| {
                Response::empty(StatusCode::GatewayTimeout)
            })
            .recover_fallback(|_req, _err| Response::internal_error())
            .timeout(Duration::from_secs(1))
            .build()
            .unwrap();

        let response = pipeline.handle(request("GET", "/slow")).await.unwrap();
        assert_eq!(response.status(), StatusCode::GatewayTimeout);
    }

    #[test]
    fn build_requires_responder_and_fallback() {
        let err = Pipeline::builder()
            .recover_fallback(|_req, _err| Response::internal_error())
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineBuildError::MissingResponder));

        let err = Pipeline::builder()
            .responder(|_req| async { Ok(Response::text("ok")) })
            .build()
            .unwrap_err();
        assert!(matches!(err, PipelineBuildError::MissingRecoveryFallback));
    }
}
