//! In-memory peer for driving a dispatch engine over the stream transport.
#![allow(dead_code)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::http::HeaderMap;
use bytes::{Bytes, BytesMut};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::UnboundedReceiverStream;

use wirecall_core::protocol::codec::{encode_envelope, EnvelopeDecoder};
use wirecall_core::protocol::frame;
use wirecall_core::Envelope;
use wirecall_server::context::{CallContext, TransportKind};
use wirecall_server::dispatch::{ActionRegistry, DispatchEngine, EngineSettings};
use wirecall_server::transport::StreamTransport;

pub const RECV_WAIT: Duration = Duration::from_secs(60);

pub struct Peer {
    inbound: Option<mpsc::UnboundedSender<Result<Bytes, Infallible>>>,
    outbound: mpsc::Receiver<Result<Bytes, Infallible>>,
    decoder: EnvelopeDecoder,
    pub engine: Arc<DispatchEngine>,
    pub task: JoinHandle<()>,
}

impl Peer {
    pub fn start(registry: Arc<ActionRegistry>, settings: EngineSettings) -> Self {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::channel(settings.outbound_queue);

        let decoder = EnvelopeDecoder::new(settings.max_frame_bytes, settings.max_pending_attachments);
        let transport = Arc::new(StreamTransport::new(
            UnboundedReceiverStream::new(in_rx),
            out_tx,
            decoder,
        ));
        let ctx = CallContext::new(TransportKind::Stream, HeaderMap::new(), Default::default());
        let engine = DispatchEngine::new(registry, transport, ctx, &settings);
        let task = tokio::spawn(Arc::clone(&engine).run());

        Self {
            inbound: Some(in_tx),
            outbound: out_rx,
            decoder: EnvelopeDecoder::new(settings.max_frame_bytes, settings.max_pending_attachments),
            engine,
            task,
        }
    }

    pub fn send(&self, env: &Envelope) {
        self.send_raw(encode_envelope(env).unwrap());
    }

    pub fn send_raw(&self, bytes: Bytes) {
        self.inbound
            .as_ref()
            .expect("input already closed")
            .send(Ok(bytes))
            .unwrap();
    }

    /// One control frame with an arbitrary body.
    pub fn send_control_body(&self, body: &[u8]) {
        let mut out = BytesMut::new();
        frame::put_control(&mut out, body).unwrap();
        self.send_raw(out.freeze());
    }

    /// End the request body.
    pub fn close_input(&mut self) {
        self.inbound.take();
    }

    /// Next outbound envelope; `None` once the response body ended.
    pub async fn recv(&mut self) -> Option<Envelope> {
        loop {
            if let Some(env) = self.decoder.next_envelope().unwrap() {
                return Some(env);
            }
            let chunk = tokio::time::timeout(RECV_WAIT, self.outbound.recv())
                .await
                .expect("no outbound frame in time")?;
            let bytes = match chunk {
                Ok(b) => b,
                Err(never) => match never {},
            };
            self.decoder.extend(&bytes);
        }
    }

    pub async fn expect(&mut self) -> Envelope {
        self.recv().await.expect("response body ended")
    }

    /// Collect `n` envelopes.
    pub async fn take(&mut self, n: usize) -> Vec<Envelope> {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n {
            out.push(self.expect().await);
        }
        out
    }
}

pub fn settings() -> EngineSettings {
    EngineSettings {
        call_timeout: Duration::from_millis(1_000),
        ..EngineSettings::default()
    }
}

pub fn builtin_registry() -> Arc<ActionRegistry> {
    let registry = Arc::new(ActionRegistry::new());
    wirecall_server::services::register_builtin(&registry);
    registry
}
