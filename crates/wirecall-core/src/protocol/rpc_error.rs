//! Structured error carried by `status: "error"` envelopes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ClientCode, WireCallError};

/// Error taxonomy visible to the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Arbitrary failure raised by an action.
    Generic,
    /// Parameters or a client response did not match the declared model.
    Validation,
    /// Unknown action name.
    NotFound,
    /// Pending client call expired (or a late/duplicate response arrived).
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Generic => "generic",
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

/// One per-field validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// JSON-pointer-like location (`""` for the root).
    pub path: String,
    pub message: String,
}

impl Issue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Wire error: `{ kind, message, code, issues? }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind} ({code}): {message}")]
pub struct RpcError {
    pub kind: ErrorKind,
    pub message: String,
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<Issue>>,
}

impl RpcError {
    /// Default code for generic failures.
    pub const GENERIC_CODE: u16 = 400;

    pub fn generic(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Generic,
            message: message.into(),
            code: Self::GENERIC_CODE,
            issues: None,
        }
    }

    /// Generic failure with an explicit code supplied by the thrower.
    pub fn with_code(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            ..Self::generic(message)
        }
    }

    pub fn validation(issues: Vec<Issue>) -> Self {
        let message = match issues.as_slice() {
            [] => "validation failed".to_string(),
            [only] if only.path.is_empty() => format!("validation failed: {}", only.message),
            [only] => format!("validation failed at {}: {}", only.path, only.message),
            many => format!("validation failed ({} issues)", many.len()),
        };
        Self {
            kind: ErrorKind::Validation,
            message,
            code: 400,
            issues: Some(issues),
        }
    }

    pub fn not_found(action: &str) -> Self {
        Self {
            kind: ErrorKind::NotFound,
            message: format!("action not found: {action}"),
            code: 404,
            issues: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            message: message.into(),
            code: 408,
            issues: None,
        }
    }
}

impl From<WireCallError> for RpcError {
    fn from(e: WireCallError) -> Self {
        let code = e.client_code();
        match code {
            ClientCode::NotFound => Self {
                kind: ErrorKind::NotFound,
                message: e.to_string(),
                code: code.numeric(),
                issues: None,
            },
            ClientCode::Timeout => Self::timeout(e.to_string()),
            _ => Self::with_code(code.numeric(), e.to_string()),
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(e: serde_json::Error) -> Self {
        Self::generic(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn wire_shape_is_stable() {
        let e = RpcError::not_found("__proto__");
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["kind"], "not_found");
        assert_eq!(v["code"], 404);
        assert!(v.get("issues").is_none());
    }

    #[test]
    fn validation_message_names_single_path() {
        let e = RpcError::validation(vec![Issue::new("/id", "expected string")]);
        assert_eq!(e.message, "validation failed at /id: expected string");
        assert_eq!(e.issues.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn core_errors_keep_their_class() {
        let e: RpcError = WireCallError::Timeout.into();
        assert_eq!(e.kind, ErrorKind::Timeout);
        let e: RpcError = WireCallError::Internal("boom".into()).into();
        assert_eq!((e.kind, e.code), (ErrorKind::Generic, 500));
    }
}
