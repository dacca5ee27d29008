//! The wire envelope (JSON control segment).
//!
//! An envelope is either a call (`status` absent) or a response chunk
//! (`status` present). Calls issued by the server into the client carry
//! `clientId`; ordinary client-to-server calls never do.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::protocol::rpc_error::RpcError;

/// Action name used when a frame cannot be attributed to any call.
pub const UNKNOWN_ACTION: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// Marker for payloads carried out-of-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BufferType {
    File,
}

/// A single RPC message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub id: String,
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub is_last: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_type: Option<BufferType>,
    /// Out-of-band body. Set by the decoder once the attachment is reunited,
    /// and turned into an attachment frame by the encoder.
    #[serde(skip)]
    pub binary: Option<Bytes>,
}

/// Value produced by an action or sent as call data.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Binary(Bytes),
}

impl Payload {
    /// JSON view; binary payloads collapse to their length.
    pub fn to_json(&self) -> Value {
        match self {
            Payload::Json(v) => v.clone(),
            Payload::Binary(b) => serde_json::json!({ "size": b.len() }),
        }
    }
}

impl From<Value> for Payload {
    fn from(v: Value) -> Self {
        Payload::Json(v)
    }
}

impl From<Bytes> for Payload {
    fn from(b: Bytes) -> Self {
        Payload::Binary(b)
    }
}

impl Envelope {
    /// Outbound call.
    pub fn call(id: impl Into<String>, action: impl Into<String>, data: Payload) -> Self {
        let mut env = Self {
            id: id.into(),
            action: action.into(),
            ..Self::default()
        };
        env.set_payload(data);
        env
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Response skeleton echoing `id`, `action` and `clientId` verbatim.
    fn reply(&self) -> Self {
        Self {
            id: self.id.clone(),
            action: self.action.clone(),
            client_id: self.client_id.clone(),
            ..Self::default()
        }
    }

    /// Successful response chunk.
    pub fn ok_chunk(&self, data: Option<Payload>, is_last: bool) -> Self {
        let mut out = self.reply();
        out.status = Some(Status::Ok);
        out.is_last = is_last;
        if let Some(p) = data {
            out.set_payload(p);
        }
        out
    }

    /// Terminal error response.
    pub fn error_reply(&self, error: RpcError) -> Self {
        let mut out = self.reply();
        out.status = Some(Status::Error);
        out.error = Some(error);
        out.is_last = true;
        out
    }

    /// Error for a frame that could not be attributed to a call.
    pub fn unattributed_error(error: RpcError) -> Self {
        Self {
            action: UNKNOWN_ACTION.to_string(),
            status: Some(Status::Error),
            error: Some(error),
            is_last: true,
            ..Self::default()
        }
    }

    pub fn set_payload(&mut self, p: Payload) {
        match p {
            Payload::Json(v) => {
                self.data = Some(v);
                self.binary = None;
                self.buffer_type = None;
            }
            Payload::Binary(b) => {
                self.data = None;
                self.binary = Some(b);
                self.buffer_type = Some(BufferType::File);
            }
        }
    }

    /// Data as a payload (binary body wins over the JSON placeholder).
    pub fn payload(&self) -> Option<Payload> {
        match (&self.binary, &self.data) {
            (Some(b), _) => Some(Payload::Binary(b.clone())),
            (None, Some(v)) => Some(Payload::Json(v.clone())),
            (None, None) => None,
        }
    }

    pub fn is_response(&self) -> bool {
        self.status.is_some()
    }

    pub fn is_error(&self) -> bool {
        self.status == Some(Status::Error)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn response_echoes_call_identity() {
        let call = Envelope::call("r1", "getUser", json!({"id": "42"}).into());
        let resp = call.ok_chunk(Some(json!({"id": "42"}).into()), true);
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            v,
            json!({"action": "getUser", "id": "r1", "status": "ok", "data": {"id": "42"}, "isLast": true})
        );
    }

    #[test]
    fn missing_optional_fields_parse() {
        let env: Envelope = serde_json::from_str(r#"{"id":"a","action":"b"}"#).unwrap();
        assert!(!env.is_response());
        assert!(!env.is_last);
        assert!(env.client_id.is_none());
    }

    #[test]
    fn binary_payload_marks_buffer_type() {
        let env = Envelope::call("x", "upload", Bytes::from_static(b"abc").into());
        assert_eq!(env.buffer_type, Some(BufferType::File));
        assert_eq!(env.payload(), Some(Payload::Binary(Bytes::from_static(b"abc"))));
    }
}
