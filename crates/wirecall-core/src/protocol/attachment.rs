//! Binary attachments: ids and reassembly.
//!
//! A control envelope with `bufferType: "file"` carries the placeholder
//! `{"attachment": "<id>", "size": n}` as its `data`. The matching ATTACHMENT
//! frame may arrive before or after the control segment, with any number of
//! unrelated frames in between. The assembler parks whichever half comes
//! first until its partner shows up.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use bytes::Bytes;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};

use crate::error::{Result, WireCallError};
use crate::protocol::envelope::{BufferType, Envelope};

pub const ATTACHMENT_ID_LEN: usize = 16;

/// Default cap for parked halves per connection.
pub const DEFAULT_MAX_PENDING: usize = 64;

/// 16 ASCII alphanumeric characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentId([u8; ATTACHMENT_ID_LEN]);

impl AttachmentId {
    pub fn generate() -> Self {
        let mut raw = [0u8; ATTACHMENT_ID_LEN];
        for (slot, c) in raw.iter_mut().zip(rand::thread_rng().sample_iter(&Alphanumeric)) {
            *slot = c;
        }
        Self(raw)
    }

    pub fn from_slice(s: &[u8]) -> Result<Self> {
        let raw: [u8; ATTACHMENT_ID_LEN] = s.try_into().map_err(|_| {
            WireCallError::BadRequest(format!(
                "attachment id must be {ATTACHMENT_ID_LEN} bytes, got {}",
                s.len()
            ))
        })?;
        if !raw.iter().all(u8::is_ascii_alphanumeric) {
            return Err(WireCallError::BadRequest(
                "attachment id must be ascii alphanumeric".into(),
            ));
        }
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        // Constructors only admit ASCII.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Placeholder stored in `data` of the control segment.
    pub fn placeholder(&self, size: usize) -> Value {
        json!({ "attachment": self.as_str(), "size": size })
    }

    /// Extract the id from a control segment's placeholder.
    pub fn from_placeholder(data: Option<&Value>) -> Result<Self> {
        let id = data
            .and_then(|d| d.get("attachment"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                WireCallError::BadRequest("bufferType=file without attachment placeholder".into())
            })?;
        Self::from_slice(id.as_bytes())
    }
}

impl fmt::Debug for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AttachmentId({})", self.as_str())
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully resolved inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    ControlOnly(Envelope),
    ControlWithAttachment {
        envelope: Envelope,
        id: AttachmentId,
        bytes: Bytes,
    },
}

impl Inbound {
    /// Envelope with the binary body reattached.
    pub fn into_envelope(self) -> Envelope {
        match self {
            Inbound::ControlOnly(env) => env,
            Inbound::ControlWithAttachment {
                mut envelope, bytes, ..
            } => {
                envelope.binary = Some(bytes);
                envelope
            }
        }
    }
}

/// Reunites control segments with their attachments.
#[derive(Debug)]
pub struct Assembler {
    waiting_controls: HashMap<AttachmentId, Envelope>,
    waiting_bytes: HashMap<AttachmentId, Bytes>,
    arrival: VecDeque<AttachmentId>,
    max_pending: usize,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PENDING)
    }
}

impl Assembler {
    pub fn new(max_pending: usize) -> Self {
        Self {
            waiting_controls: HashMap::new(),
            waiting_bytes: HashMap::new(),
            arrival: VecDeque::new(),
            max_pending: max_pending.max(1),
        }
    }

    /// Number of parked halves.
    pub fn pending(&self) -> usize {
        self.waiting_controls.len() + self.waiting_bytes.len()
    }

    /// Feed a parsed control envelope.
    pub fn accept_control(&mut self, envelope: Envelope) -> Result<Option<Inbound>> {
        if envelope.buffer_type != Some(BufferType::File) {
            return Ok(Some(Inbound::ControlOnly(envelope)));
        }
        let id = match AttachmentId::from_placeholder(envelope.data.as_ref()) {
            Ok(id) => id,
            Err(e) => {
                return Err(WireCallError::BadEnvelope {
                    reason: e.to_string(),
                    envelope: Box::new(envelope),
                })
            }
        };
        if let Some(bytes) = self.waiting_bytes.remove(&id) {
            self.forget(&id);
            return Ok(Some(Inbound::ControlWithAttachment { envelope, id, bytes }));
        }
        self.park();
        self.waiting_controls.insert(id, envelope);
        self.arrival.push_back(id);
        Ok(None)
    }

    /// Feed an attachment frame.
    pub fn accept_attachment(&mut self, id: AttachmentId, bytes: Bytes) -> Option<Inbound> {
        if let Some(envelope) = self.waiting_controls.remove(&id) {
            self.forget(&id);
            return Some(Inbound::ControlWithAttachment { envelope, id, bytes });
        }
        self.park();
        self.waiting_bytes.insert(id, bytes);
        self.arrival.push_back(id);
        None
    }

    fn forget(&mut self, id: &AttachmentId) {
        self.arrival.retain(|x| x != id);
    }

    /// Make room for one more parked half by evicting the oldest.
    fn park(&mut self) {
        while self.pending() >= self.max_pending {
            let Some(oldest) = self.arrival.pop_front() else {
                break;
            };
            let had_control = self.waiting_controls.remove(&oldest).is_some();
            let had_bytes = self.waiting_bytes.remove(&oldest).is_some();
            tracing::warn!(id = %oldest, had_control, had_bytes, "evicting unmatched attachment half");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn control_for(id: &AttachmentId) -> Envelope {
        Envelope {
            id: "r1".into(),
            action: "upload".into(),
            data: Some(id.placeholder(3)),
            buffer_type: Some(BufferType::File),
            ..Envelope::default()
        }
    }

    #[test]
    fn generated_ids_are_alphanumeric() {
        let id = AttachmentId::generate();
        assert_eq!(id.as_str().len(), ATTACHMENT_ID_LEN);
        assert!(AttachmentId::from_slice(id.as_bytes()).is_ok());
    }

    #[test]
    fn control_then_attachment() {
        let id = AttachmentId::generate();
        let mut asm = Assembler::default();
        assert!(asm.accept_control(control_for(&id)).unwrap().is_none());
        let got = asm.accept_attachment(id, Bytes::from_static(b"abc")).unwrap();
        assert_eq!(got.into_envelope().binary, Some(Bytes::from_static(b"abc")));
        assert_eq!(asm.pending(), 0);
    }

    #[test]
    fn attachment_then_control() {
        let id = AttachmentId::generate();
        let mut asm = Assembler::default();
        assert!(asm.accept_attachment(id, Bytes::from_static(b"xyz")).is_none());
        let got = asm.accept_control(control_for(&id)).unwrap().unwrap();
        assert!(matches!(got, Inbound::ControlWithAttachment { .. }));
        assert_eq!(asm.pending(), 0);
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut asm = Assembler::new(2);
        let first = AttachmentId::generate();
        asm.accept_attachment(first, Bytes::from_static(b"1"));
        asm.accept_attachment(AttachmentId::generate(), Bytes::from_static(b"2"));
        asm.accept_attachment(AttachmentId::generate(), Bytes::from_static(b"3"));
        assert_eq!(asm.pending(), 2);
        assert!(asm.accept_control(control_for(&first)).unwrap().is_none());
    }

    #[test]
    fn missing_placeholder_is_bad_request() {
        let env = Envelope {
            id: "r1".into(),
            action: "upload".into(),
            buffer_type: Some(BufferType::File),
            ..Envelope::default()
        };
        let err = Assembler::default().accept_control(env).unwrap_err();
        assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
        assert!(!err.is_fatal_for_stream());
        let env = err.envelope().unwrap();
        assert_eq!((env.id.as_str(), env.action.as_str()), ("r1", "upload"));
    }

    #[test]
    fn malformed_placeholder_id_keeps_the_envelope() {
        let env = Envelope {
            id: "r2".into(),
            action: "upload".into(),
            data: Some(serde_json::json!({ "attachment": "short", "size": 3 })),
            buffer_type: Some(BufferType::File),
            ..Envelope::default()
        };
        let err = Assembler::default().accept_control(env).unwrap_err();
        assert_eq!(err.envelope().map(|e| e.id.as_str()), Some("r2"));
    }
}
