//! Immutable HTTP-like request value.

use bytes::Bytes;

use super::headers::HeaderMap;
use super::query::QueryMap;
use crate::identity::ConnectionIdentity;

/// An immutable inbound request.
///
/// A request is constructed once by a transport adapter (or a test) and
/// never mutated afterwards. Filters that need to change a request build
/// a new value via [`Request::into_builder`].
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    uri: String,
    path: Vec<String>,
    query: QueryMap,
    headers: HeaderMap,
    body: Bytes,
    keep_alive: bool,
    identity: ConnectionIdentity,
}

impl Request {
    /// Starts building a request.
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// Canonical uppercase request method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Raw request target as received on the wire.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Percent-decoded path segments derived from the uri.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Query parameters derived from the uri.
    pub fn query(&self) -> &QueryMap {
        &self.query
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Request body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Whether the connection should stay open after the response.
    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Identity used to route the response back to its origin.
    pub fn identity(&self) -> &ConnectionIdentity {
        &self.identity
    }

    /// Turns this request back into a builder so a filter can produce a
    /// derived request without mutating the original value.
    pub fn into_builder(self) -> RequestBuilder {
        RequestBuilder {
            method: self.method,
            uri: self.uri,
            query: Some(self.query),
            headers: self.headers,
            body: self.body,
            keep_alive: self.keep_alive,
            identity: self.identity,
        }
    }
}

/// Builder for [`Request`].
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    method: String,
    uri: String,
    query: Option<QueryMap>,
    headers: HeaderMap,
    body: Bytes,
    keep_alive: bool,
    identity: ConnectionIdentity,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    /// Creates a builder with `GET /` defaults.
    pub fn new() -> Self {
        Self {
            method: "GET".to_string(),
            uri: "/".to_string(),
            query: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            keep_alive: true,
            identity: ConnectionIdentity::Local,
        }
    }

    /// Sets the method; stored in canonical uppercase.
    pub fn method(mut self, method: impl AsRef<str>) -> Self {
        self.method = method.as_ref().to_ascii_uppercase();
        self
    }

    /// Sets the raw request target. Path segments and query parameters
    /// are derived from it at build time unless a query was set
    /// explicitly.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = uri.into();
        self.query = None;
        self
    }

    /// Overrides the query parameters.
    pub fn query(mut self, query: QueryMap) -> Self {
        self.query = Some(query);
        self
    }

    /// Adds a header (appending, preserving earlier entries).
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces the full header map.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the keep-alive flag.
    pub fn keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Sets the connection identity.
    pub fn identity(mut self, identity: ConnectionIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Builds the immutable request.
    pub fn build(self) -> Request {
        let (raw_path, raw_query) = split_target(&self.uri);
        let query = self
            .query
            .unwrap_or_else(|| QueryMap::parse(raw_query));

        Request {
            method: self.method,
            path: decode_segments(raw_path),
            query,
            uri: self.uri,
            headers: self.headers,
            body: self.body,
            keep_alive: self.keep_alive,
            identity: self.identity,
        }
    }
}

/// Splits a request target into path and query parts.
fn split_target(uri: &str) -> (&str, &str) {
    match uri.split_once('?') {
        Some((path, query)) => (path, query),
        None => (uri, ""),
    }
}

/// Splits a raw path into percent-decoded segments, dropping the empty
/// fragments produced by leading or doubled slashes.
fn decode_segments(raw_path: &str) -> Vec<String> {
    raw_path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .collect()
}
