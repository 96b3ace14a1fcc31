//! Route extractors.
//!
//! An extractor is a pure function from `&Request` to
//! `Option<Output>`: either the request matches and some values are
//! bound, or it does not match. Extractors compose with
//! [`ExtractExt::and`] (both must match, outputs paired) and
//! [`ExtractExt::or`] (ordered alternation, first success wins and the
//! second side is never evaluated).
//!
//! The extractor layer is advisory glue used inside the responder; its
//! only failure mode is "no match", which the responder handles with a
//! fallback clause (see [`Router`](crate::Router)).

use weld_core::{QueryMap, Request};

/// A pure matcher decomposing a request into bound values.
pub trait Extract: Send + Sync {
    /// Values bound on a successful match.
    type Output;

    /// Attempts to match, returning the bound values or `None`.
    fn extract(&self, request: &Request) -> Option<Self::Output>;
}

/// Combinator methods for extractors.
pub trait ExtractExt: Extract + Sized {
    /// Logical AND: both sides must match; outputs are paired.
    fn and<B: Extract>(self, other: B) -> And<Self, B> {
        And { a: self, b: other }
    }

    /// Ordered alternation: the first side is tried first and wins on
    /// success; the second side is only evaluated when it fails.
    fn or<B: Extract<Output = Self::Output>>(self, other: B) -> Or<Self, B> {
        Or { a: self, b: other }
    }
}

impl<E: Extract + Sized> ExtractExt for E {}

// =============================================================================
// Combinators
// =============================================================================

/// See [`ExtractExt::and`].
pub struct And<A, B> {
    a: A,
    b: B,
}

impl<A: Extract, B: Extract> Extract for And<A, B> {
    type Output = (A::Output, B::Output);

    fn extract(&self, request: &Request) -> Option<Self::Output> {
        Some((self.a.extract(request)?, self.b.extract(request)?))
    }
}

/// See [`ExtractExt::or`].
pub struct Or<A, B> {
    a: A,
    b: B,
}

impl<A: Extract, B: Extract<Output = A::Output>> Extract for Or<A, B> {
    type Output = A::Output;

    fn extract(&self, request: &Request) -> Option<Self::Output> {
        self.a
            .extract(request)
            .or_else(|| self.b.extract(request))
    }
}

// =============================================================================
// Method extractors
// =============================================================================

/// Matches an exact HTTP verb.
pub struct MethodIs {
    method: String,
}

impl Extract for MethodIs {
    type Output = ();

    fn extract(&self, request: &Request) -> Option<()> {
        (request.method() == self.method).then_some(())
    }
}

/// Matches the given verb (case-insensitive).
pub fn method(verb: impl AsRef<str>) -> MethodIs {
    MethodIs {
        method: verb.as_ref().to_ascii_uppercase(),
    }
}

/// Matches `GET` requests.
pub fn get() -> MethodIs {
    method("GET")
}

/// Matches `POST` requests.
pub fn post() -> MethodIs {
    method("POST")
}

/// Matches `PUT` requests.
pub fn put() -> MethodIs {
    method("PUT")
}

/// Matches `DELETE` requests.
pub fn delete() -> MethodIs {
    method("DELETE")
}

// =============================================================================
// Path extractors
// =============================================================================

/// Matches an exact literal path.
pub struct PathIs {
    segments: Vec<String>,
}

impl Extract for PathIs {
    type Output = ();

    fn extract(&self, request: &Request) -> Option<()> {
        (request.path() == self.segments).then_some(())
    }
}

/// Matches the literal path exactly, e.g. `path("/example")`.
pub fn path(literal: &str) -> PathIs {
    PathIs {
        segments: literal
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// Matches a fixed first segment and binds the remaining segments as a
/// variable-length tail.
pub struct PathPrefix {
    first: String,
}

impl Extract for PathPrefix {
    type Output = Vec<String>;

    fn extract(&self, request: &Request) -> Option<Vec<String>> {
        let (head, tail) = request.path().split_first()?;
        (*head == self.first).then(|| tail.to_vec())
    }
}

/// Matches `/<first>/...` and binds the tail, e.g.
/// `path_prefix("users")` on `/users/42/posts` binds `["42", "posts"]`.
pub fn path_prefix(first: impl Into<String>) -> PathPrefix {
    PathPrefix {
        first: first.into(),
    }
}

/// Always matches, binding the whole decoded segment list.
pub struct Segments;

impl Extract for Segments {
    type Output = Vec<String>;

    fn extract(&self, request: &Request) -> Option<Vec<String>> {
        Some(request.path().to_vec())
    }
}

/// Binds the full segment list of any request.
pub fn segments() -> Segments {
    Segments
}

// =============================================================================
// Query extractor
// =============================================================================

/// Always matches, binding the full query map.
pub struct Query;

impl Extract for Query {
    type Output = QueryMap;

    fn extract(&self, request: &Request) -> Option<QueryMap> {
        Some(request.query().clone())
    }
}

/// Binds the query parameters for combination with other extractors.
pub fn query() -> Query {
    Query
}

// =============================================================================
// Closure extractors
// =============================================================================

impl<F, T> Extract for F
where
    F: Fn(&Request) -> Option<T> + Send + Sync,
{
    type Output = T;

    fn extract(&self, request: &Request) -> Option<T> {
        self(request)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn request(method: &str, uri: &str) -> Request {
        Request::builder().method(method).uri(uri).build()
    }

    #[test]
    fn method_extractor_matches_exact_verb() {
        let req = request("GET", "/example");
        assert!(get().extract(&req).is_some());
        assert!(post().extract(&req).is_none());
        assert!(method("get").extract(&req).is_some());
    }

    #[test]
    fn path_literal_matches_exactly() {
        let req = request("GET", "/users/42");
        assert!(path("/users/42").extract(&req).is_some());
        assert!(path("/users").extract(&req).is_none());
        assert!(path("/users/42/posts").extract(&req).is_none());
    }

    #[test]
    fn path_prefix_binds_tail() {
        let req = request("GET", "/users/42/posts");
        let tail = path_prefix("users").extract(&req).unwrap();
        assert_eq!(tail, ["42", "posts"]);
        assert!(path_prefix("posts").extract(&req).is_none());
    }

    #[test]
    fn and_pairs_both_outputs() {
        let req = request("GET", "/search?q=weld");

        let (((), ()), params) = get()
            .and(path("/search"))
            .and(query())
            .extract(&req)
            .expect("all three sides should match");
        assert_eq!(params.first("q"), Some("weld"));

        assert!(post().and(path("/search")).extract(&req).is_none());
    }

    #[test]
    fn or_short_circuits_on_first_match() {
        let req = request("GET", "/a");
        let second_evaluated = AtomicUsize::new(0);

        let first = |req: &Request| path("/a").extract(req).map(|_| "first");
        let second = |req: &Request| {
            second_evaluated.fetch_add(1, Ordering::SeqCst);
            path("/a").extract(req).map(|_| "second")
        };

        assert_eq!(first.or(second).extract(&req), Some("first"));
        assert_eq!(second_evaluated.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn or_falls_through_to_second() {
        let req = request("POST", "/b");
        let chain = (|req: &Request| get().extract(req).map(|_| "get"))
            .or(|req: &Request| post().extract(req).map(|_| "post"));
        assert_eq!(chain.extract(&req), Some("post"));
    }
}
