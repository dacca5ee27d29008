//! wirecall server
//!
//! - duplex HTTP stream, WebSocket and plain fan-out surfaces
//! - strict YAML config (`WIRECALL_CONFIG`, default `wirecall.yaml`)
//! - graceful shutdown on ctrl-c: readiness flips, open connections drain

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use wirecall_core::{Result, WireCallError};
use wirecall_server::{app_state::AppState, config, dispatch::ActionRegistry, router, services};

#[tokio::main]
async fn main() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "wirecall server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let path = config::default_path();
    let cfg = config::load_from_file(&path)?;
    let listen: SocketAddr = cfg
        .server
        .listen
        .parse()
        .map_err(|e| WireCallError::BadRequest(format!("server.listen must be a socket address: {e}")))?;

    let registry = Arc::new(ActionRegistry::new());
    services::register_builtin(&registry);

    let state = AppState::new(cfg, registry);
    let app = router::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| WireCallError::Internal(format!("bind {listen} failed: {e}")))?;
    tracing::info!(%listen, config = %path, "wirecall server starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| WireCallError::Internal(format!("server failed: {e}")))?;

    tracing::info!("wirecall server stopped");
    Ok(())
}

async fn shutdown_signal(state: AppState) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler unavailable; shutting down");
    }
    state.set_draining();
    tracing::info!(active = state.active_connections(), "shutdown requested; draining");
}
