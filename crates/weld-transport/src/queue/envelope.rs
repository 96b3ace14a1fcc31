//! Request and response envelopes.
//!
//! A request envelope is five netstring fields: sender identity,
//! connection identity, raw path, a JSON header block and the body.
//! The header block carries the reserved meta keys `METHOD` (the HTTP
//! verb) and optionally `QUERY` (the raw query string); every other key
//! becomes a request header.
//!
//! A response envelope reverses the addressing: sender and connection
//! identity netstrings followed by one netstring holding the raw
//! serialized HTTP-style response.

use bytes::{Bytes, BytesMut};

use weld_core::identity::WILDCARD_CONNECTION;
use weld_core::{ConnectionIdentity, DecodeError, DecodeResult, HeaderMap, Request};

use super::codec::encode_netstring;

/// One decoded inbound envelope.
#[derive(Debug)]
pub enum Envelope {
    /// A request to run through the pipeline.
    Request(RequestEnvelope),

    /// A directive telling the worker that the broker dropped every
    /// connection of this sender. Never routed through the pipeline
    /// and never answered.
    Disconnect {
        /// Sender whose connections were dropped.
        sender: String,
    },
}

/// A decoded request envelope.
#[derive(Debug)]
pub struct RequestEnvelope {
    /// Broker sender identity.
    pub sender: String,
    /// Connection identity within the sender.
    pub connection: String,
    /// Raw request path.
    pub path: String,
    /// Verb extracted from the header block.
    pub method: String,
    /// Raw query string from the header block, if any.
    pub query: Option<String>,
    /// Remaining header-block keys.
    pub headers: HeaderMap,
    /// Body bytes.
    pub body: Bytes,
}

impl Envelope {
    /// Decodes an envelope from its five raw fields.
    pub fn decode(
        sender: &[u8],
        connection: &[u8],
        path: &[u8],
        header_block: &[u8],
        body: &[u8],
    ) -> DecodeResult<Self> {
        let sender = field_str(sender, "sender identity")?;
        let connection = field_str(connection, "connection identity")?;
        if sender.is_empty() {
            return Err(DecodeError::Envelope("empty sender identity".into()));
        }

        // The reserved empty-body wildcard envelope is a disconnect
        // directive, not a request.
        if connection == WILDCARD_CONNECTION && body.is_empty() {
            return Ok(Self::Disconnect { sender });
        }

        let path = field_str(path, "path")?;
        let block: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(header_block)
            .map_err(|err| DecodeError::Envelope(format!("bad header block: {err}")))?;

        let mut method = None;
        let mut query = None;
        let mut headers = HeaderMap::new();
        for (key, value) in &block {
            let value = value
                .as_str()
                .ok_or_else(|| DecodeError::Envelope(format!("non-string header: {key}")))?;
            match key.as_str() {
                "METHOD" => method = Some(value.to_string()),
                "QUERY" => query = Some(value.to_string()),
                _ => headers.append(key, value),
            }
        }

        Ok(Self::Request(RequestEnvelope {
            sender,
            connection,
            path,
            method: method
                .ok_or_else(|| DecodeError::Envelope("header block has no METHOD".into()))?,
            query,
            headers,
            body: Bytes::copy_from_slice(body),
        }))
    }
}

impl RequestEnvelope {
    /// Reconstructs the pipeline request, with the connection identity
    /// set to this envelope's (sender, connection) pair.
    pub fn into_request(self) -> Request {
        let uri = match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        };
        Request::builder()
            .method(&self.method)
            .uri(uri)
            .headers(self.headers)
            .body(self.body)
            .identity(ConnectionIdentity::queue(self.sender, self.connection))
            .build()
    }
}

/// A response envelope addressed back to one (sender, connection) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    /// Broker sender identity.
    pub sender: String,
    /// Connection identity within the sender.
    pub connection: String,
    /// Raw serialized HTTP-style response.
    pub payload: Vec<u8>,
}

impl ResponseEnvelope {
    /// Builds a reply envelope.
    pub fn new(
        sender: impl Into<String>,
        connection: impl Into<String>,
        payload: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            sender: sender.into(),
            connection: connection.into(),
            payload: payload.into(),
        }
    }

    /// Serializes the envelope as three netstrings.
    pub fn encode(&self, out: &mut BytesMut) {
        encode_netstring(out, self.sender.as_bytes());
        encode_netstring(out, self.connection.as_bytes());
        encode_netstring(out, &self.payload);
    }
}

fn field_str(raw: &[u8], what: &str) -> DecodeResult<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|_| DecodeError::Envelope(format!("{what} is not valid UTF-8")))
}
