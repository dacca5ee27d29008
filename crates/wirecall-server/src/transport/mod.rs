//! Transport layer.
//!
//! A `Transport` owns one physical channel and speaks envelopes. Two
//! realizations share the same frame codec:
//! - `stream`: duplex HTTP body (request body in, response body out);
//! - `socket`: WebSocket, inbound messages pushed in via `feed_message`.
//!
//! The axum handlers for both surfaces, plus plain (non-streaming) mode, live
//! next to them.

use async_trait::async_trait;

use wirecall_core::error::Result;
use wirecall_core::Envelope;

use crate::context::TransportKind;

pub mod codec;
pub mod http;
pub mod plain;
mod reader;
pub mod socket;
pub mod stream;
pub mod ws;

pub use socket::SocketTransport;
pub use stream::StreamTransport;

#[async_trait]
pub trait Transport: Send + Sync {
    fn kind(&self) -> TransportKind;

    /// Encode and flush one envelope. Fails only when the channel is gone.
    async fn write(&self, env: &Envelope) -> Result<()>;

    /// Like `write`, but never waits for queue space: a full queue fails
    /// immediately. Used on the read path, which must not stall behind
    /// outbound backpressure.
    fn try_write(&self, env: &Envelope) -> Result<()>;

    /// Next decoded envelope; `None` once the channel is closed.
    ///
    /// Frames that fail to parse are answered with an `"unknown"` error
    /// envelope and skipped.
    async fn read(&self) -> Option<Envelope>;

    /// Stop accepting writes and release the channel.
    async fn close(&self);
}
