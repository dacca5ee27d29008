//! Length-prefixed frames (panic-free).
//!
//! Layout:
//! ```text
//! [1 byte  kind]    0x01 = CONTROL, 0x02 = ATTACHMENT
//! [4 bytes length]  big-endian u32
//! [length bytes]    body
//! ```
//! A CONTROL body is one JSON envelope. An ATTACHMENT body is a 16-byte ASCII
//! attachment id followed by the raw payload.
//!
//! Parsing rules:
//! - Never index (`buf[0]`); only `get(..)` and `remaining()` checks.
//! - Never `unwrap()` / `expect()` / `panic!()` in production paths.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, WireCallError};
use crate::protocol::attachment::{AttachmentId, ATTACHMENT_ID_LEN};

pub const KIND_CONTROL: u8 = 0x01;
pub const KIND_ATTACHMENT: u8 = 0x02;

/// kind (1) + length (4).
pub const HEADER_LEN: usize = 5;

/// Default upper bound for a single frame body.
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// One decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Control(Bytes),
    Attachment { id: AttachmentId, payload: Bytes },
}

/// Append a CONTROL frame.
pub fn put_control(out: &mut BytesMut, body: &[u8]) -> Result<()> {
    put_header(out, KIND_CONTROL, body.len())?;
    out.put_slice(body);
    Ok(())
}

/// Append an ATTACHMENT frame.
pub fn put_attachment(out: &mut BytesMut, id: &AttachmentId, payload: &[u8]) -> Result<()> {
    put_header(out, KIND_ATTACHMENT, ATTACHMENT_ID_LEN + payload.len())?;
    out.put_slice(id.as_bytes());
    out.put_slice(payload);
    Ok(())
}

fn put_header(out: &mut BytesMut, kind: u8, len: usize) -> Result<()> {
    let len = u32::try_from(len).map_err(|_| WireCallError::PayloadTooLarge {
        len,
        max: u32::MAX as usize,
    })?;
    out.reserve(HEADER_LEN + len as usize);
    out.put_u8(kind);
    out.put_u32(len);
    Ok(())
}

/// Incremental frame splitter over an arbitrary chunking of the byte stream.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    max_frame_bytes: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES)
    }
}

impl FrameDecoder {
    pub fn new(max_frame_bytes: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_frame_bytes,
        }
    }

    /// Append raw bytes as they arrive.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Bytes received but not yet consumed as whole frames.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Next complete frame, `Ok(None)` when more bytes are needed.
    ///
    /// Errors leave the stream without a known frame boundary; callers must
    /// stop decoding after one.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        let (kind, len) = match (self.buf.first(), self.buf.get(1..HEADER_LEN)) {
            (Some(&kind), Some(len_bytes)) => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(len_bytes);
                (kind, u32::from_be_bytes(raw) as usize)
            }
            _ => return Ok(None),
        };

        if kind != KIND_CONTROL && kind != KIND_ATTACHMENT {
            return Err(WireCallError::Framing(format!("unknown frame kind 0x{kind:02x}")));
        }
        if len > self.max_frame_bytes {
            return Err(WireCallError::PayloadTooLarge {
                len,
                max: self.max_frame_bytes,
            });
        }
        if self.buf.remaining() < HEADER_LEN + len {
            return Ok(None);
        }

        self.buf.advance(HEADER_LEN);
        let mut body = self.buf.split_to(len).freeze();

        if kind == KIND_CONTROL {
            return Ok(Some(Frame::Control(body)));
        }

        // body already consumed, so the stream is still aligned
        if body.remaining() < ATTACHMENT_ID_LEN {
            return Err(WireCallError::BadRequest(
                "attachment frame shorter than its id".into(),
            ));
        }
        let id = AttachmentId::from_slice(&body.split_to(ATTACHMENT_ID_LEN))?;
        Ok(Some(Frame::Attachment { id, payload: body }))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::panic)]

    use super::*;

    #[test]
    fn partial_header_waits_for_more() {
        let mut out = BytesMut::new();
        put_control(&mut out, br#"{"id":"1","action":"a"}"#).unwrap();

        let mut dec = FrameDecoder::default();
        dec.extend(&out[..3]);
        assert!(dec.next_frame().unwrap().is_none());
        dec.extend(&out[3..10]);
        assert!(dec.next_frame().unwrap().is_none());
        dec.extend(&out[10..]);
        let frame = dec.next_frame().unwrap().unwrap();
        assert!(matches!(frame, Frame::Control(ref b) if b.starts_with(b"{")));
        assert_eq!(dec.buffered(), 0);
    }

    #[test]
    fn unknown_kind_is_framing_error() {
        let mut dec = FrameDecoder::default();
        dec.extend(&[0x09, 0, 0, 0, 1, b'x']);
        let err = dec.next_frame().unwrap_err();
        assert_eq!(err.client_code().as_str(), "FRAMING");
    }

    #[test]
    fn oversized_length_rejected_before_buffering() {
        let mut dec = FrameDecoder::new(8);
        dec.extend(&[KIND_CONTROL, 0, 0, 0, 9]);
        let err = dec.next_frame().unwrap_err();
        assert!(err.is_fatal_for_stream());
        assert_eq!(err.client_code().as_str(), "PAYLOAD_TOO_LARGE");
    }

    #[test]
    fn attachment_carries_id_and_payload() {
        let id = AttachmentId::from_slice(b"abcdefghijklmnop").unwrap();
        let mut out = BytesMut::new();
        put_attachment(&mut out, &id, &[0, 1, 2, 255]).unwrap();

        let mut dec = FrameDecoder::default();
        dec.extend(&out);
        match dec.next_frame().unwrap().unwrap() {
            Frame::Attachment { id: got, payload } => {
                assert_eq!(got, id);
                assert_eq!(&payload[..], &[0, 1, 2, 255]);
            }
            other => panic!("unexpected frame {other:?}"),
        }
    }
}
