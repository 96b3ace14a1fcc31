//! Netstring framing.
//!
//! A netstring is `<decimal length>:<payload>,`. Envelope fields are
//! consecutive netstrings with nothing in between, so the decoder peeks
//! at the buffer without consuming until a whole envelope is present.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use weld_core::{DecodeError, DecodeResult, TransportError};

use super::envelope::{Envelope, ResponseEnvelope};

/// Default upper bound on a single netstring payload.
pub const MAX_NETSTRING_BYTES: usize = 16 * 1024 * 1024;

/// Longest accepted length prefix (enough for the maximum payload).
const MAX_LENGTH_DIGITS: usize = 10;

/// Appends one netstring to `out`.
pub fn encode_netstring(out: &mut BytesMut, payload: &[u8]) {
    out.put_slice(payload.len().to_string().as_bytes());
    out.put_u8(b':');
    out.put_slice(payload);
    out.put_u8(b',');
}

/// Peeks one netstring starting at `pos`.
///
/// Returns the payload range and the position after the trailing comma,
/// or `None` when the buffer does not yet hold the whole frame.
pub fn peek_netstring(
    buf: &[u8],
    pos: usize,
    limit: usize,
) -> DecodeResult<Option<(std::ops::Range<usize>, usize)>> {
    let rest = &buf[pos.min(buf.len())..];

    let colon = match rest.iter().take(MAX_LENGTH_DIGITS + 1).position(|&b| b == b':') {
        Some(idx) => idx,
        None if rest.len() <= MAX_LENGTH_DIGITS => return Ok(None),
        None => {
            return Err(DecodeError::Netstring(
                "length prefix missing its colon".into(),
            ));
        }
    };

    let digits = &rest[..colon];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(DecodeError::Netstring(format!(
            "bad length prefix: {:?}",
            String::from_utf8_lossy(digits)
        )));
    }
    if digits.len() > 1 && digits[0] == b'0' {
        return Err(DecodeError::Netstring("leading zero in length".into()));
    }

    let len: usize = digits
        .iter()
        .try_fold(0usize, |acc, &d| {
            acc.checked_mul(10)?.checked_add(usize::from(d - b'0'))
        })
        .ok_or_else(|| DecodeError::Netstring("length prefix overflow".into()))?;
    if len > limit {
        return Err(DecodeError::TooLarge { len, limit });
    }

    let payload_start = pos + colon + 1;
    let payload_end = payload_start + len;
    if buf.len() < payload_end + 1 {
        return Ok(None);
    }
    if buf[payload_end] != b',' {
        return Err(DecodeError::Netstring("missing trailing comma".into()));
    }

    Ok(Some((payload_start..payload_end, payload_end + 1)))
}

/// Decodes one netstring from the front of `buf`, consuming it.
pub fn decode_netstring(buf: &mut BytesMut, limit: usize) -> DecodeResult<Option<Bytes>> {
    match peek_netstring(buf, 0, limit)? {
        Some((range, end)) => {
            let payload = Bytes::copy_from_slice(&buf[range]);
            buf.advance(end);
            Ok(Some(payload))
        }
        None => Ok(None),
    }
}

/// Framed codec for broker streams.
///
/// Decoded items are themselves results: a well-framed envelope whose
/// content is malformed decodes to `Err(DecodeError)` so the worker can
/// drop it and keep the stream alive, while framing-level corruption is
/// a fatal codec error.
pub struct EnvelopeCodec {
    limit: usize,
}

impl EnvelopeCodec {
    /// Codec with the default frame limit.
    pub fn new() -> Self {
        Self {
            limit: MAX_NETSTRING_BYTES,
        }
    }
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for EnvelopeCodec {
    type Item = DecodeResult<Envelope>;
    type Error = TransportError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // A request envelope is five consecutive netstrings; consume
        // nothing until all five are buffered.
        let mut fields: Vec<std::ops::Range<usize>> = Vec::with_capacity(5);
        let mut pos = 0;
        for _ in 0..5 {
            match peek_netstring(src, pos, self.limit)? {
                Some((range, next)) => {
                    fields.push(range);
                    pos = next;
                }
                None => return Ok(None),
            }
        }

        let envelope = Envelope::decode(
            &src[fields[0].clone()],
            &src[fields[1].clone()],
            &src[fields[2].clone()],
            &src[fields[3].clone()],
            &src[fields[4].clone()],
        );
        src.advance(pos);
        Ok(Some(envelope))
    }
}

impl Encoder<ResponseEnvelope> for EnvelopeCodec {
    type Error = TransportError;

    fn encode(&mut self, item: ResponseEnvelope, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn netstring_round_trip() {
        let mut buf = BytesMut::new();
        encode_netstring(&mut buf, b"hello");
        assert_eq!(&buf[..], b"5:hello,");

        let decoded = decode_netstring(&mut buf, MAX_NETSTRING_BYTES).unwrap();
        assert_eq!(decoded.unwrap().as_ref(), b"hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn empty_payload_round_trip() {
        let mut buf = BytesMut::new();
        encode_netstring(&mut buf, b"");
        assert_eq!(&buf[..], b"0:,");
        let decoded = decode_netstring(&mut buf, MAX_NETSTRING_BYTES).unwrap();
        assert_eq!(decoded.unwrap().len(), 0);
    }

    #[test]
    fn partial_frame_asks_for_more() {
        let mut buf = BytesMut::from(&b"5:hel"[..]);
        assert!(decode_netstring(&mut buf, MAX_NETSTRING_BYTES)
            .unwrap()
            .is_none());
        assert_eq!(&buf[..], b"5:hel");
    }

    #[test]
    fn bad_length_prefix_is_rejected() {
        let mut buf = BytesMut::from(&b"5x:hello,"[..]);
        assert!(matches!(
            decode_netstring(&mut buf, MAX_NETSTRING_BYTES),
            Err(DecodeError::Netstring(_))
        ));
    }

    #[test]
    fn missing_comma_is_rejected() {
        let mut buf = BytesMut::from(&b"5:hello!"[..]);
        assert!(matches!(
            decode_netstring(&mut buf, MAX_NETSTRING_BYTES),
            Err(DecodeError::Netstring(_))
        ));
    }

    #[test]
    fn oversized_frame_is_rejected() {
        let mut buf = BytesMut::from(&b"100:"[..]);
        assert!(matches!(
            decode_netstring(&mut buf, 10),
            Err(DecodeError::TooLarge { len: 100, limit: 10 })
        ));
    }
}
