//! Envelope codec on top of frames.
//!
//! Encoding an envelope produces one contiguous buffer (control frame, plus an
//! attachment frame when the envelope has a binary body), so a single write
//! never interleaves with another envelope at the byte level.

use bytes::{Bytes, BytesMut};

use crate::error::{Result, WireCallError};
use crate::protocol::attachment::{Assembler, AttachmentId, DEFAULT_MAX_PENDING};
use crate::protocol::envelope::{BufferType, Envelope};
use crate::protocol::frame::{self, Frame, FrameDecoder, DEFAULT_MAX_FRAME_BYTES};

/// Serialize an envelope into wire frames.
pub fn encode_envelope(env: &Envelope) -> Result<Bytes> {
    let mut out = BytesMut::new();
    match &env.binary {
        None => {
            let body = serde_json::to_vec(env)
                .map_err(|e| WireCallError::Internal(format!("envelope encode failed: {e}")))?;
            frame::put_control(&mut out, &body)?;
        }
        Some(bytes) => {
            let id = AttachmentId::generate();
            let mut control = env.clone();
            control.binary = None;
            control.buffer_type = Some(BufferType::File);
            control.data = Some(id.placeholder(bytes.len()));
            let body = serde_json::to_vec(&control)
                .map_err(|e| WireCallError::Internal(format!("envelope encode failed: {e}")))?;
            frame::put_control(&mut out, &body)?;
            frame::put_attachment(&mut out, &id, bytes)?;
        }
    }
    Ok(out.freeze())
}

/// Parse one control segment.
pub fn decode_control(body: &[u8]) -> Result<Envelope> {
    serde_json::from_slice(body)
        .map_err(|e| WireCallError::BadRequest(format!("invalid envelope json: {e}")))
}

/// Incremental decoder: raw bytes in, whole envelopes out.
///
/// Errors for which [`WireCallError::is_fatal_for_stream`] holds poison the
/// decoder; any other error concerns a single frame and decoding may
/// continue.
#[derive(Debug)]
pub struct EnvelopeDecoder {
    frames: FrameDecoder,
    assembler: Assembler,
    poisoned: bool,
}

impl Default for EnvelopeDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_BYTES, DEFAULT_MAX_PENDING)
    }
}

impl EnvelopeDecoder {
    pub fn new(max_frame_bytes: usize, max_pending_attachments: usize) -> Self {
        Self {
            frames: FrameDecoder::new(max_frame_bytes),
            assembler: Assembler::new(max_pending_attachments),
            poisoned: false,
        }
    }

    pub fn extend(&mut self, chunk: &[u8]) {
        if !self.poisoned {
            self.frames.extend(chunk);
        }
    }

    /// Feed a control body that arrived already delimited (e.g. a WebSocket
    /// text message).
    pub fn push_control(&mut self, body: &[u8]) -> Result<Option<Envelope>> {
        let env = decode_control(body)?;
        Ok(self.assembler.accept_control(env)?.map(|i| i.into_envelope()))
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// True when no partial frame or parked attachment half remains.
    pub fn is_idle(&self) -> bool {
        self.frames.buffered() == 0 && self.assembler.pending() == 0
    }

    /// Next complete envelope, `Ok(None)` when more bytes are needed.
    pub fn next_envelope(&mut self) -> Result<Option<Envelope>> {
        if self.poisoned {
            return Err(WireCallError::Framing("stream already desynchronized".into()));
        }
        loop {
            let frame = match self.frames.next_frame() {
                Ok(Some(f)) => f,
                Ok(None) => return Ok(None),
                Err(e) => {
                    if e.is_fatal_for_stream() {
                        self.poisoned = true;
                    }
                    return Err(e);
                }
            };
            let ready = match frame {
                Frame::Control(body) => self.push_control(&body)?,
                Frame::Attachment { id, payload } => self
                    .assembler
                    .accept_attachment(id, payload)
                    .map(|i| i.into_envelope()),
            };
            if let Some(env) = ready {
                return Ok(Some(env));
            }
        }
    }
}
