//! HTTP/1.1 response serialization.

use bytes::{BufMut, BytesMut};

use weld_core::{Response, StatusCode};

/// Hardcoded minimal server-error response, sent when the pipeline
/// reports a fatal after-filter failure and no composed response
/// exists.
pub const MINIMAL_ERROR: &[u8] =
    b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// Serializes a response for the event-socket transport, appending the
/// `Connection` header derived from the keep-alive decision.
pub fn encode_response(response: &Response, keep_alive: bool) -> BytesMut {
    encode(response, Some(keep_alive))
}

/// Serializes a response payload without a `Connection` header, as
/// embedded in queue-worker reply envelopes.
pub fn encode_payload(response: &Response) -> BytesMut {
    encode(response, None)
}

/// Serializes a bare 400-class response for a request that failed to
/// parse; the connection is closed afterwards.
pub fn encode_parse_failure() -> BytesMut {
    encode(&Response::empty(StatusCode::BadRequest), Some(false))
}

fn encode(response: &Response, connection: Option<bool>) -> BytesMut {
    let mut out = BytesMut::with_capacity(128 + response.body().len());

    out.put_slice(b"HTTP/1.1 ");
    out.put_slice(response.status().to_string().as_bytes());
    out.put_slice(b"\r\n");

    for (name, value) in response.headers().iter() {
        if name.eq_ignore_ascii_case("content-length") || name.eq_ignore_ascii_case("connection") {
            continue;
        }
        out.put_slice(name.as_bytes());
        out.put_slice(b": ");
        out.put_slice(value.as_bytes());
        out.put_slice(b"\r\n");
    }

    out.put_slice(b"Content-Length: ");
    out.put_slice(response.body().len().to_string().as_bytes());
    out.put_slice(b"\r\n");

    if let Some(keep_alive) = connection {
        out.put_slice(if keep_alive {
            b"Connection: keep-alive\r\n".as_slice()
        } else {
            b"Connection: close\r\n".as_slice()
        });
    }

    out.put_slice(b"\r\n");
    out.put_slice(response.body());
    out
}
