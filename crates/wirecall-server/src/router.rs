//! Axum router wiring.
//!
//! - stream route: duplex HTTP body (POST/PUT/PATCH/DELETE; GET -> 405)
//! - plain route: one-shot fan-out (GET query / POST JSON)
//! - socket route: WebSocket upgrade
//! - `/healthz`, `/readyz`

use axum::{
    routing::{get, post},
    Router,
};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    let routes = state.cfg().routes.clone();
    let stream = transport::http::stream_rpc;

    Router::new()
        .route(
            &routes.stream,
            post(stream).put(stream).patch(stream).delete(stream),
        )
        .route(
            &routes.plain,
            get(transport::plain::plain_get).post(transport::plain::plain_post),
        )
        .route(&routes.socket, get(transport::ws::ws_upgrade))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .with_state(state)
}
