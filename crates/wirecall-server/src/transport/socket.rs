//! Persistent socket transport.
//!
//! The socket's reader task pushes every inbound message through
//! `feed_message` / `feed_text`; `read()` consumes them in order. Writes go
//! to the socket's writer task as binary messages.

use std::sync::{Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use axum::extract::ws::Message;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::ReceiverStream;

use wirecall_core::error::{Result, WireCallError};
use wirecall_core::protocol::codec::{encode_envelope, EnvelopeDecoder};
use wirecall_core::Envelope;

use crate::context::TransportKind;
use crate::transport::codec;
use crate::transport::reader::{Chunk, InboundReader};
use crate::transport::Transport;

pub struct SocketTransport {
    reader: Mutex<InboundReader>,
    inbound: StdMutex<Option<mpsc::Sender<Chunk>>>,
    outbound: StdMutex<Option<mpsc::Sender<Message>>>,
}

impl SocketTransport {
    /// `outbound` feeds the socket writer; `queue` bounds buffered inbound
    /// messages.
    pub fn new(outbound: mpsc::Sender<Message>, decoder: EnvelopeDecoder, queue: usize) -> Self {
        let (in_tx, in_rx) = mpsc::channel(queue.max(1));
        Self {
            reader: Mutex::new(InboundReader::new(decoder, ReceiverStream::new(in_rx).boxed())),
            inbound: StdMutex::new(Some(in_tx)),
            outbound: StdMutex::new(Some(outbound)),
        }
    }

    async fn feed(&self, chunk: Chunk) {
        let tx = self
            .inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(tx) = tx else {
            tracing::debug!("inbound message after close dropped");
            return;
        };
        if tx.send(chunk).await.is_err() {
            tracing::debug!("inbound message dropped; reader gone");
        }
    }

    /// Push a binary message received from the socket.
    pub async fn feed_message(&self, bytes: Bytes) {
        self.feed(Chunk::Frames(bytes)).await;
    }

    /// Push a text message (one control segment).
    pub async fn feed_text(&self, text: String) {
        self.feed(Chunk::Control(Bytes::from(text))).await;
    }

    /// The peer went away; `read()` returns `None` once queued input is consumed.
    pub fn feed_closed(&self) {
        self.inbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn outbound(&self) -> Option<mpsc::Sender<Message>> {
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Transport for SocketTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Socket
    }

    async fn write(&self, env: &Envelope) -> Result<()> {
        let tx = self.outbound().ok_or(WireCallError::ChannelClosed)?;
        let bytes = encode_envelope(env)?;
        tx.send(codec::encode(bytes))
            .await
            .map_err(|_| WireCallError::ChannelClosed)
    }

    fn try_write(&self, env: &Envelope) -> Result<()> {
        let tx = self.outbound().ok_or(WireCallError::ChannelClosed)?;
        let bytes = encode_envelope(env)?;
        tx.try_send(codec::encode(bytes)).map_err(|e| match e {
            TrySendError::Full(_) => WireCallError::Internal("outbound queue full".into()),
            TrySendError::Closed(_) => WireCallError::ChannelClosed,
        })
    }

    async fn read(&self) -> Option<Envelope> {
        let mut reader = self.reader.lock().await;
        reader.read(self).await
    }

    async fn close(&self) {
        self.feed_closed();
        let tx = self
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(tx) = tx {
            let _ = tx.send(Message::Close(None)).await;
        }
    }
}
