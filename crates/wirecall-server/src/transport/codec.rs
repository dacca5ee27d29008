//! WebSocket message <-> frame bytes.
//!
//! - Binary messages carry one or more whole frames.
//! - Text messages carry exactly one control segment (no frame header).
//! - Ping/Pong/Close are surfaced for lifecycle management.

use axum::extract::ws::Message;
use bytes::Bytes;

#[derive(Debug)]
pub enum SocketInbound {
    Frames(Bytes),
    Text(String),
    Ping(Vec<u8>),
    Pong,
    Close,
}

pub fn decode(msg: Message) -> SocketInbound {
    match msg {
        Message::Binary(b) => SocketInbound::Frames(Bytes::from(b)),
        Message::Text(s) => SocketInbound::Text(s),
        Message::Ping(v) => SocketInbound::Ping(v),
        Message::Pong(_) => SocketInbound::Pong,
        Message::Close(_) => SocketInbound::Close,
    }
}

/// Encoded envelope frames as one binary message.
pub fn encode(frames: Bytes) -> Message {
    Message::Binary(frames.to_vec())
}
