//! HTTP/1.x request parsing.
//!
//! One readable unit of data becomes exactly one request: request line,
//! headers until a blank line, then a body sized by `Content-Length` or
//! chunked framing. Parse failures are reported as [`DecodeError`]s so
//! the server can answer with a 400-class response without ever
//! invoking the pipeline.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use weld_core::{DecodeError, DecodeResult, HeaderMap};

/// Upper bound on the request line plus headers.
pub const MAX_HEAD_BYTES: usize = 64 * 1024;

/// Upper bound on a request body, framed either way.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Parsed request line and headers.
#[derive(Debug)]
pub struct RequestHead {
    /// Verb as sent on the wire.
    pub method: String,
    /// Raw request target.
    pub target: String,
    /// True for `HTTP/1.1`, false for `HTTP/1.0`.
    pub http_11: bool,
    /// Header fields in wire order.
    pub headers: HeaderMap,
}

/// How the body of a request is delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// No body.
    None,
    /// Exactly this many bytes follow the head.
    Length(usize),
    /// Chunked transfer encoding.
    Chunked,
}

/// One fully parsed inbound message.
#[derive(Debug)]
pub struct Message {
    /// Request line and headers.
    pub head: RequestHead,
    /// Body bytes, already de-chunked where applicable.
    pub body: Bytes,
}

enum ReadError {
    Io(std::io::Error),
    Decode(DecodeError),
}

impl From<std::io::Error> for ReadError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<DecodeError> for ReadError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

/// Reads the next message from the connection.
///
/// Returns `Ok(None)` on a clean end of stream between messages. A
/// `DecodeResult::Err` inside means the peer sent malformed bytes; the
/// caller answers 400 and closes.
pub async fn read_message<R>(
    reader: &mut R,
    buf: &mut BytesMut,
) -> std::io::Result<Option<DecodeResult<Message>>>
where
    R: AsyncRead + Unpin,
{
    match read_message_inner(reader, buf).await {
        Ok(message) => Ok(message.map(Ok)),
        Err(ReadError::Io(err)) => Err(err),
        Err(ReadError::Decode(err)) => Ok(Some(Err(err))),
    }
}

async fn read_message_inner<R>(
    reader: &mut R,
    buf: &mut BytesMut,
) -> Result<Option<Message>, ReadError>
where
    R: AsyncRead + Unpin,
{
    // Accumulate until the blank line ending the head.
    let head_end = loop {
        if let Some(idx) = find_blank_line(buf) {
            break idx;
        }
        if buf.len() > MAX_HEAD_BYTES {
            return Err(DecodeError::TooLarge {
                len: buf.len(),
                limit: MAX_HEAD_BYTES,
            }
            .into());
        }
        if reader.read_buf(buf).await? == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(DecodeError::UnexpectedEof.into());
        }
    };

    let head_bytes = buf.split_to(head_end + 4);
    let head = parse_head(&head_bytes[..head_end])?;

    let body = match body_framing(&head.headers)? {
        BodyFraming::None => Bytes::new(),
        BodyFraming::Length(len) => {
            fill_to(reader, buf, len).await?;
            buf.split_to(len).freeze()
        }
        BodyFraming::Chunked => read_chunked(reader, buf).await?,
    };

    Ok(Some(Message { head, body }))
}

/// Parses the request line and header lines (blank line excluded).
pub fn parse_head(head: &[u8]) -> DecodeResult<RequestHead> {
    let text = std::str::from_utf8(head)
        .map_err(|_| DecodeError::RequestLine("head is not valid UTF-8".into()))?;
    let mut lines = text.split("\r\n");

    let request_line = lines
        .next()
        .ok_or_else(|| DecodeError::RequestLine("empty head".into()))?;
    let mut parts = request_line.split(' ');
    let (method, target, version) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(m), Some(t), Some(v), None) if !m.is_empty() && !t.is_empty() => (m, t, v),
        _ => return Err(DecodeError::RequestLine(request_line.to_string())),
    };

    let http_11 = match version {
        "HTTP/1.1" => true,
        "HTTP/1.0" => false,
        other => return Err(DecodeError::RequestLine(format!("bad version: {other}"))),
    };

    let mut headers = HeaderMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| DecodeError::Header(line.to_string()))?;
        if name.is_empty() || name.contains(' ') {
            return Err(DecodeError::Header(line.to_string()));
        }
        headers.append(name, value.trim());
    }

    Ok(RequestHead {
        method: method.to_string(),
        target: target.to_string(),
        http_11,
        headers,
    })
}

/// Determines the body framing from the parsed headers.
pub fn body_framing(headers: &HeaderMap) -> DecodeResult<BodyFraming> {
    if let Some(te) = headers.get("transfer-encoding") {
        if te
            .split(',')
            .any(|t| t.trim().eq_ignore_ascii_case("chunked"))
        {
            return Ok(BodyFraming::Chunked);
        }
        return Err(DecodeError::Framing(format!(
            "unsupported transfer encoding: {te}"
        )));
    }

    match headers.get("content-length") {
        Some(raw) => {
            let len: usize = raw
                .trim()
                .parse()
                .map_err(|_| DecodeError::Framing(format!("bad content-length: {raw}")))?;
            if len > MAX_BODY_BYTES {
                return Err(DecodeError::TooLarge {
                    len,
                    limit: MAX_BODY_BYTES,
                });
            }
            Ok(BodyFraming::Length(len))
        }
        None => Ok(BodyFraming::None),
    }
}

/// Keep-alive decision: explicit `Connection` header wins, otherwise
/// the HTTP version default (1.1 keeps alive, 1.0 closes).
pub fn keep_alive(http_11: bool, headers: &HeaderMap) -> bool {
    match headers.get("connection").map(str::to_ascii_lowercase) {
        Some(value) if value.contains("close") => false,
        Some(value) if value.contains("keep-alive") => true,
        _ => http_11,
    }
}

fn find_blank_line(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

async fn fill_to<R>(reader: &mut R, buf: &mut BytesMut, len: usize) -> Result<(), ReadError>
where
    R: AsyncRead + Unpin,
{
    while buf.len() < len {
        if reader.read_buf(buf).await? == 0 {
            return Err(DecodeError::UnexpectedEof.into());
        }
    }
    Ok(())
}

async fn read_line<R>(reader: &mut R, buf: &mut BytesMut) -> Result<BytesMut, ReadError>
where
    R: AsyncRead + Unpin,
{
    loop {
        if let Some(idx) = buf.windows(2).position(|w| w == b"\r\n") {
            let line = buf.split_to(idx);
            let _ = buf.split_to(2);
            return Ok(line);
        }
        if buf.len() > MAX_HEAD_BYTES {
            return Err(DecodeError::Framing("chunk size line too long".into()).into());
        }
        if reader.read_buf(buf).await? == 0 {
            return Err(DecodeError::UnexpectedEof.into());
        }
    }
}

async fn read_chunked<R>(reader: &mut R, buf: &mut BytesMut) -> Result<Bytes, ReadError>
where
    R: AsyncRead + Unpin,
{
    let mut body = BytesMut::new();
    loop {
        let line = read_line(reader, buf).await?;
        let size_text = std::str::from_utf8(&line)
            .map_err(|_| DecodeError::Framing("chunk size is not UTF-8".into()))?;
        let size_text = size_text.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_text, 16)
            .map_err(|_| DecodeError::Framing(format!("bad chunk size: {size_text}")))?;

        if body.len() + size > MAX_BODY_BYTES {
            return Err(DecodeError::TooLarge {
                len: body.len() + size,
                limit: MAX_BODY_BYTES,
            }
            .into());
        }

        if size == 0 {
            // Trailers are consumed and discarded.
            loop {
                let trailer = read_line(reader, buf).await?;
                if trailer.is_empty() {
                    return Ok(body.freeze());
                }
            }
        }

        fill_to(reader, buf, size + 2).await?;
        body.extend_from_slice(&buf.split_to(size));
        let crlf = buf.split_to(2);
        if &crlf[..] != b"\r\n" {
            return Err(DecodeError::Framing("chunk missing CRLF".into()).into());
        }
    }
}
