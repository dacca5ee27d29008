//! Shared error type across wirecall crates.

use thiserror::Error;

use crate::protocol::envelope::Envelope;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed message.
    BadRequest,
    /// Byte stream could not be split into frames.
    Framing,
    /// Frame larger than the configured limit.
    PayloadTooLarge,
    /// Peer or local channel already gone.
    ChannelClosed,
    /// No answer before the deadline.
    Timeout,
    /// Unknown action.
    NotFound,
    /// Unsupported config/protocol version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::Framing => "FRAMING",
            ClientCode::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ClientCode::ChannelClosed => "CHANNEL_CLOSED",
            ClientCode::Timeout => "TIMEOUT",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }

    /// Numeric code carried in wire errors.
    pub fn numeric(self) -> u16 {
        match self {
            ClientCode::BadRequest | ClientCode::Framing | ClientCode::UnsupportedVersion => 400,
            ClientCode::NotFound => 404,
            ClientCode::Timeout => 408,
            ClientCode::PayloadTooLarge => 413,
            ClientCode::ChannelClosed => 499,
            ClientCode::Internal => 500,
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, WireCallError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum WireCallError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("framing: {0}")]
    Framing(String),
    #[error("payload too large: {len} > {max}")]
    PayloadTooLarge { len: usize, max: usize },
    #[error("channel closed")]
    ChannelClosed,
    #[error("timeout")]
    Timeout,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unsupported version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
    /// Control segment parsed, but its content is unusable. Carries the
    /// envelope so the reply can be attributed to its call.
    #[error("bad request: {reason}")]
    BadEnvelope { envelope: Box<Envelope>, reason: String },
}

impl WireCallError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            WireCallError::BadRequest(_) | WireCallError::BadEnvelope { .. } => {
                ClientCode::BadRequest
            }
            WireCallError::Framing(_) => ClientCode::Framing,
            WireCallError::PayloadTooLarge { .. } => ClientCode::PayloadTooLarge,
            WireCallError::ChannelClosed => ClientCode::ChannelClosed,
            WireCallError::Timeout => ClientCode::Timeout,
            WireCallError::NotFound(_) => ClientCode::NotFound,
            WireCallError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            WireCallError::Internal(_) => ClientCode::Internal,
        }
    }

    /// Envelope the error belongs to, when it was parsed far enough to know.
    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            WireCallError::BadEnvelope { envelope, .. } => Some(envelope),
            _ => None,
        }
    }

    /// Framing errors leave the byte stream without a known frame boundary.
    pub fn is_fatal_for_stream(&self) -> bool {
        matches!(
            self,
            WireCallError::Framing(_) | WireCallError::PayloadTooLarge { .. }
        )
    }
}
