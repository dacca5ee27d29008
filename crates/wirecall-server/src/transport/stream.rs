//! Duplex HTTP body transport.
//!
//! The request body is read incrementally for the whole life of the
//! connection; the response body is an open channel that receives one
//! encoded envelope per write.

use std::convert::Infallible;
use std::fmt::Display;
use std::sync::{Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, Mutex};

use wirecall_core::error::{Result, WireCallError};
use wirecall_core::protocol::codec::{encode_envelope, EnvelopeDecoder};
use wirecall_core::Envelope;

use crate::context::TransportKind;
use crate::transport::reader::{Chunk, InboundReader};
use crate::transport::Transport;

/// Sender side of a streaming response body.
pub type BodySender = mpsc::Sender<std::result::Result<Bytes, Infallible>>;

pub struct StreamTransport {
    reader: Mutex<InboundReader>,
    tx: StdMutex<Option<BodySender>>,
}

impl StreamTransport {
    /// `body` yields request body chunks; a body error ends the read side.
    pub fn new<S, E>(body: S, tx: BodySender, decoder: EnvelopeDecoder) -> Self
    where
        S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let chunks = body
            .take_while(|item| {
                let keep = match item {
                    Ok(_) => true,
                    Err(e) => {
                        tracing::debug!(error = %e, "request body ended with error");
                        false
                    }
                };
                futures_util::future::ready(keep)
            })
            .filter_map(|item| futures_util::future::ready(item.ok().map(Chunk::Frames)))
            .boxed();

        Self {
            reader: Mutex::new(InboundReader::new(decoder, chunks)),
            tx: StdMutex::new(Some(tx)),
        }
    }

    fn sender(&self) -> Option<BodySender> {
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Transport for StreamTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }

    async fn write(&self, env: &Envelope) -> Result<()> {
        let tx = self.sender().ok_or(WireCallError::ChannelClosed)?;
        let bytes = encode_envelope(env)?;
        tx.send(Ok(bytes))
            .await
            .map_err(|_| WireCallError::ChannelClosed)
    }

    fn try_write(&self, env: &Envelope) -> Result<()> {
        let tx = self.sender().ok_or(WireCallError::ChannelClosed)?;
        let bytes = encode_envelope(env)?;
        tx.try_send(Ok(bytes)).map_err(|e| match e {
            TrySendError::Full(_) => WireCallError::Internal("outbound queue full".into()),
            TrySendError::Closed(_) => WireCallError::ChannelClosed,
        })
    }

    async fn read(&self) -> Option<Envelope> {
        let mut reader = self.reader.lock().await;
        reader.read(self).await
    }

    async fn close(&self) {
        // dropping the last sender ends the response body
        self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}
