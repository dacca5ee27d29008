//! Duplex HTTP body surface.
//!
//! `POST/PUT/PATCH/DELETE` on the stream route open a connection whose
//! request body carries inbound frames and whose response body carries
//! outbound frames, both for as long as either side keeps them open.
//! GET has no body and is answered with 405 by the router.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::Instrument;

use wirecall_core::protocol::codec::EnvelopeDecoder;
use wirecall_core::RpcError;

use crate::app_state::AppState;
use crate::context::{self, TransportKind};
use crate::dispatch::DispatchEngine;
use crate::transport::StreamTransport;

/// Content type of framed bodies.
pub const FRAMED_CONTENT_TYPE: &str = "application/x-wirecall-frames";

pub async fn stream_rpc(State(app): State<AppState>, headers: HeaderMap, body: Body) -> Response {
    if app.is_draining() {
        return draining_response();
    }
    let ctx = match context::establish(&app.registry(), TransportKind::Stream, &headers) {
        Ok(ctx) => ctx,
        Err(e) => return rejection_response(e),
    };

    let settings = app.cfg().server.engine_settings();
    let (tx, rx) = mpsc::channel(settings.outbound_queue);
    let decoder = EnvelopeDecoder::new(settings.max_frame_bytes, settings.max_pending_attachments);
    let transport = Arc::new(StreamTransport::new(body.into_data_stream(), tx, decoder));

    let span = tracing::info_span!("conn", id = %ctx.connection_id(), transport = "stream");
    let engine = DispatchEngine::new(app.registry(), transport, ctx, &settings);
    let guard = app.connection_guard();
    let shutdown = app.drain_signal();
    tokio::spawn(
        async move {
            engine.run_until(shutdown).await;
            drop(guard);
        }
        .instrument(span),
    );

    (
        [(header::CONTENT_TYPE, FRAMED_CONTENT_TYPE)],
        Body::from_stream(ReceiverStream::new(rx)),
    )
        .into_response()
}

/// Hook rejection: the error's code as HTTP status, the error as JSON body.
pub(crate) fn rejection_response(e: RpcError) -> Response {
    let status = StatusCode::from_u16(e.code)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::FORBIDDEN);
    tracing::debug!(code = e.code, message = %e.message, "connection rejected");
    (status, Json(e)).into_response()
}

pub(crate) fn draining_response() -> Response {
    (StatusCode::SERVICE_UNAVAILABLE, "draining").into_response()
}
