//! wirecall core: transport-agnostic protocol primitives and error types.
//!
//! This crate defines the wire envelope, the structured RPC error carried
//! inside it, and the self-delimiting frame codec (including out-of-band binary
//! attachments). It carries no async runtime so the same codec backs the HTTP
//! body stream, the WebSocket transport, and client SDK tooling.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Every malformed
//! byte sequence surfaces as `WireCallError` so a hostile peer cannot take
//! down the read loop.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;

/// Shared result type.
pub use error::{Result, WireCallError};
pub use protocol::envelope::{BufferType, Envelope, Payload, Status};
pub use protocol::rpc_error::{ErrorKind, Issue, RpcError};
