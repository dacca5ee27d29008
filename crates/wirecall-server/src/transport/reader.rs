//! Inbound half shared by both transports.

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;

use wirecall_core::error::WireCallError;
use wirecall_core::protocol::codec::EnvelopeDecoder;
use wirecall_core::{Envelope, RpcError};

use crate::transport::Transport;

/// Unit of inbound data.
#[derive(Debug)]
pub(crate) enum Chunk {
    /// Raw bytes holding zero or more (possibly partial) frames.
    Frames(Bytes),
    /// One control body delimited by the carrier (WebSocket text message).
    Control(Bytes),
}

pub(crate) struct InboundReader {
    decoder: EnvelopeDecoder,
    chunks: BoxStream<'static, Chunk>,
    done: bool,
}

impl InboundReader {
    pub(crate) fn new(decoder: EnvelopeDecoder, chunks: BoxStream<'static, Chunk>) -> Self {
        Self {
            decoder,
            chunks,
            done: false,
        }
    }

    async fn next_raw(&mut self) -> Option<Result<Envelope, WireCallError>> {
        loop {
            if self.done {
                return None;
            }
            match self.decoder.next_envelope() {
                Ok(Some(env)) => return Some(Ok(env)),
                Ok(None) => {}
                Err(e) => {
                    if e.is_fatal_for_stream() {
                        self.done = true;
                    }
                    return Some(Err(e));
                }
            }
            match self.chunks.next().await {
                Some(Chunk::Frames(b)) => self.decoder.extend(&b),
                Some(Chunk::Control(b)) => match self.decoder.push_control(&b) {
                    Ok(Some(env)) => return Some(Ok(env)),
                    Ok(None) => {}
                    Err(e) => return Some(Err(e)),
                },
                None => {
                    if !self.decoder.is_idle() {
                        tracing::warn!("channel closed with a partial frame or unmatched attachment");
                    }
                    self.done = true;
                    return None;
                }
            }
        }
    }

    /// Next envelope, answering undecodable frames on `transport`.
    pub(crate) async fn read(&mut self, transport: &dyn Transport) -> Option<Envelope> {
        loop {
            match self.next_raw().await? {
                Ok(env) => return Some(env),
                Err(e) => {
                    let fatal = e.is_fatal_for_stream();
                    tracing::warn!(error = %e, fatal, "undecodable inbound frame");
                    let reply = match e {
                        WireCallError::BadEnvelope { envelope, reason } => {
                            envelope.error_reply(RpcError::generic(reason))
                        }
                        other => Envelope::unattributed_error(RpcError::from(other)),
                    };
                    if let Err(we) = transport.try_write(&reply) {
                        tracing::warn!(error = %we, "frame error reply dropped");
                    }
                    if fatal {
                        return None;
                    }
                }
            }
        }
    }
}
