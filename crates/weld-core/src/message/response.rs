//! Immutable HTTP-like response value.

use bytes::Bytes;

use super::headers::HeaderMap;
use super::status::StatusCode;

/// An immutable outbound response.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Starts building a response with the given status.
    pub fn builder(status: StatusCode) -> ResponseBuilder {
        ResponseBuilder {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// A bare response with the given status and empty body.
    pub fn empty(status: StatusCode) -> Self {
        Self::builder(status).build()
    }

    /// A `200 OK` response with a text body.
    pub fn text(body: impl Into<Bytes>) -> Self {
        Self::builder(StatusCode::Ok)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body)
            .build()
    }

    /// The generic opaque server error used when no recovery clause
    /// matched. Carries no internal detail.
    pub fn internal_error() -> Self {
        Self::builder(StatusCode::InternalServerError)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body("Internal Server Error")
            .build()
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Response body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Turns this response back into a builder so an after filter can
    /// produce a derived response.
    pub fn into_builder(self) -> ResponseBuilder {
        ResponseBuilder {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

/// Builder for [`Response`].
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ResponseBuilder {
    /// Replaces the status.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Adds a header, replacing earlier entries with the same name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
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

    /// Builds the immutable response.
    pub fn build(self) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}
