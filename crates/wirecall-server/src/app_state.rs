//! Shared application state for the wirecall server.
//!
//! Holds the validated config, the action registry shared by every
//! connection, and the draining signal flipped on shutdown. Protocol state is
//! never stored here; each connection builds its own dispatch engine.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::config::RpcConfig;
use crate::dispatch::ActionRegistry;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: RpcConfig,
    registry: Arc<ActionRegistry>,
    draining: watch::Sender<bool>,
    connections: AtomicUsize,
}

impl AppState {
    pub fn new(cfg: RpcConfig, registry: Arc<ActionRegistry>) -> Self {
        let actions = registry.action_names();
        let client_actions = registry.client_action_names();
        if actions.is_empty() {
            tracing::warn!("no actions registered; every call will be answered with not_found");
        }
        tracing::debug!(?actions, ?client_actions, "action registry ready");

        let (draining, _) = watch::channel(false);
        Self {
            inner: Arc::new(AppStateInner {
                cfg,
                registry,
                draining,
                connections: AtomicUsize::new(0),
            }),
        }
    }

    pub fn cfg(&self) -> &RpcConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<ActionRegistry> {
        Arc::clone(&self.inner.registry)
    }

    /// Stop accepting new connections and tell every open one to drain.
    pub fn set_draining(&self) {
        self.inner.draining.send_replace(true);
    }

    pub fn is_draining(&self) -> bool {
        *self.inner.draining.borrow()
    }

    /// Resolves once draining starts (immediately if it already has).
    pub fn drain_signal(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.inner.draining.subscribe();
        async move {
            // an error means the state is gone, which is a shutdown too
            let _ = rx.wait_for(|draining| *draining).await;
        }
    }

    pub fn active_connections(&self) -> usize {
        self.inner.connections.load(Ordering::Relaxed)
    }

    /// Count a live streaming/socket connection until the guard drops.
    pub fn connection_guard(&self) -> ConnectionGuard {
        self.inner.connections.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard {
            state: self.clone(),
        }
    }
}

pub struct ConnectionGuard {
    state: AppState,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.state.inner.connections.fetch_sub(1, Ordering::Relaxed);
    }
}
