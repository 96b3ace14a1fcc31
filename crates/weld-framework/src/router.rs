//! Ordered first-match-wins routing.
//!
//! A [`Router`] is an ordered list of (extractor, handler) entries plus
//! a required fallback. Dispatch scans the entries in registration
//! order; the first extractor that matches wins and later entries are
//! not evaluated, mirroring sequential pattern-match semantics.

use std::future::Future;

use tracing::trace;

use weld_core::{PipelineResult, Request, Response};

use crate::extract::Extract;
use crate::pipeline::BoxFuture;

type RouteEntry =
    Box<dyn Fn(Request) -> Result<BoxFuture<'static, PipelineResult<Response>>, Request> + Send + Sync>;
type FallbackEntry =
    Box<dyn Fn(Request) -> BoxFuture<'static, PipelineResult<Response>> + Send + Sync>;

/// Builder stage of a router: routes are added in dispatch order and the
/// router is completed by supplying the fallback.
#[derive(Default)]
pub struct RouterBuilder {
    routes: Vec<RouteEntry>,
}

/// A complete routing table with its fallback clause.
pub struct Router {
    routes: Vec<RouteEntry>,
    fallback: FallbackEntry,
}

impl Router {
    /// Starts a routing table.
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> RouterBuilder {
        RouterBuilder::default()
    }

    /// Dispatches a request to the first matching route, or the
    /// fallback when no route matches.
    pub async fn dispatch(&self, request: Request) -> PipelineResult<Response> {
        let mut request = request;
        for (index, route) in self.routes.iter().enumerate() {
            match route(request) {
                Ok(future) => {
                    trace!(route = index, "route matched");
                    return future.await;
                }
                Err(unmatched) => request = unmatched,
            }
        }
        trace!("no route matched, taking fallback");
        (self.fallback)(request).await
    }

    /// Number of routes, fallback excluded.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// True if only the fallback is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl RouterBuilder {
    /// Appends a route. The handler receives the request together with
    /// the values bound by the extractor.
    pub fn route<E, F, Fut>(mut self, extractor: E, handler: F) -> Self
    where
        E: Extract + 'static,
        F: Fn(Request, E::Output) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PipelineResult<Response>> + Send + 'static,
    {
        self.routes.push(Box::new(move |request| {
            match extractor.extract(&request) {
                Some(bound) => Ok(Box::pin(handler(request, bound))),
                None => Err(request),
            }
        }));
        self
    }

    /// Completes the router with the required fallback clause, invoked
    /// when no route matches.
    pub fn fallback<F, Fut>(self, handler: F) -> Router
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PipelineResult<Response>> + Send + 'static,
    {
        Router {
            routes: self.routes,
            fallback: Box::new(move |request| Box::pin(handler(request))),
        }
    }
}

#[cfg(test)]
mod tests {
    use weld_core::StatusCode;

    use super::*;
    use crate::extract::{get, path, post, ExtractExt};

    fn request(method: &str, uri: &str) -> Request {
        Request::builder().method(method).uri(uri).build()
    }

    fn example_router() -> Router {
        Router::new()
            .route(get().and(path("/example")), |_req, _| async {
                Ok(Response::text("hello"))
            })
            .route(post().and(path("/submit")), |req, _| async move {
                Ok(Response::text(req.body().clone()))
            })
            .fallback(|_req| async { Ok(Response::empty(StatusCode::NotFound)) })
    }

    #[tokio::test]
    async fn first_matching_route_wins() {
        let router = Router::new()
            .route(get(), |_req, _| async { Ok(Response::text("first")) })
            .route(get().and(path("/example")), |_req, _| async {
                Ok(Response::text("second"))
            })
            .fallback(|_req| async { Ok(Response::empty(StatusCode::NotFound)) });

        let response = router.dispatch(request("GET", "/example")).await.unwrap();
        assert_eq!(response.body().as_ref(), b"first");
    }

    #[tokio::test]
    async fn unmatched_request_takes_fallback() {
        let router = example_router();
        let response = router
            .dispatch(request("POST", "/unknown-path"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NotFound);
    }

    #[tokio::test]
    async fn handler_sees_the_request() {
        let router = example_router();
        let req = Request::builder()
            .method("POST")
            .uri("/submit")
            .body("payload")
            .build();

        let response = router.dispatch(req).await.unwrap();
        assert_eq!(response.body().as_ref(), b"payload");
    }
}
