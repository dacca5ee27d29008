//! WebSocket surface.
//!
//! Responsibilities:
//! - Upgrade HTTP -> WS after the context hook accepted the connection
//! - Pump inbound messages into the `SocketTransport`
//! - Drain outbound messages to the socket
//! - Keepalive ping
//!
//! The dispatch engine runs as its own task and owns protocol state; this
//! loop only moves messages.

use std::sync::Arc;

use axum::{
    extract::{ws::Message, ws::WebSocket, ws::WebSocketUpgrade, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Duration, MissedTickBehavior};
use tracing::Instrument;

use wirecall_core::protocol::codec::EnvelopeDecoder;

use crate::app_state::AppState;
use crate::context::{self, CallContext, TransportKind};
use crate::dispatch::DispatchEngine;
use crate::transport::codec::{decode, SocketInbound};
use crate::transport::http::{draining_response, rejection_response};
use crate::transport::SocketTransport;

pub async fn ws_upgrade(
    State(app): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    if app.is_draining() {
        return draining_response();
    }
    let ctx = match context::establish(&app.registry(), TransportKind::Socket, &headers) {
        Ok(ctx) => ctx,
        Err(e) => return rejection_response(e),
    };

    let span = tracing::info_span!("conn", id = %ctx.connection_id(), transport = "socket");
    ws.on_upgrade(move |socket| run_socket(app, ctx, socket).instrument(span))
        .into_response()
}

async fn run_socket(app: AppState, ctx: CallContext, socket: WebSocket) {
    let server = &app.cfg().server;
    let settings = server.engine_settings();

    // ---- outbound channel (transport -> socket writer)
    let (out_tx, mut out_rx) = mpsc::channel::<Message>(settings.outbound_queue);
    let decoder = EnvelopeDecoder::new(settings.max_frame_bytes, settings.max_pending_attachments);
    let transport = Arc::new(SocketTransport::new(out_tx, decoder, settings.outbound_queue));

    let engine = DispatchEngine::new(app.registry(), transport.clone(), ctx, &settings);
    let engine_task = tokio::spawn(engine.run_until(app.drain_signal()).in_current_span());
    let _guard = app.connection_guard();

    let (mut ws_tx, mut ws_rx) = socket.split();

    let mut ping_tick = tokio::time::interval(Duration::from_millis(server.ping_interval_ms));
    ping_tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut inbound_open = true;

    loop {
        tokio::select! {
            // outbound writer; ends once the engine closed the transport
            maybe_out = out_rx.recv() => {
                let Some(m) = maybe_out else { break; };
                let closing = matches!(m, Message::Close(_));
                if ws_tx.send(m).await.is_err() || closing {
                    break;
                }
            }

            // inbound reader
            incoming = ws_rx.next(), if inbound_open => {
                let msg = match incoming {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "socket read failed");
                        inbound_open = false;
                        transport.feed_closed();
                        continue;
                    }
                    None => {
                        inbound_open = false;
                        transport.feed_closed();
                        continue;
                    }
                };
                match decode(msg) {
                    SocketInbound::Frames(b) => transport.feed_message(b).await,
                    SocketInbound::Text(s) => transport.feed_text(s).await,
                    SocketInbound::Ping(payload) => {
                        if ws_tx.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    SocketInbound::Pong => {}
                    SocketInbound::Close => {
                        inbound_open = false;
                        transport.feed_closed();
                    }
                }
            }

            _ = ping_tick.tick() => {
                if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    // socket is gone either way; let the engine finish draining
    transport.feed_closed();
    drop(out_rx);
    if let Err(e) = engine_task.await {
        tracing::warn!(error = %e, "engine task failed");
    }
}
