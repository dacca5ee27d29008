//! Per-connection dispatch engine.
//!
//! The engine owns the connection's transport and correlation table. Its read
//! loop hands every inbound envelope to a task of its own:
//! - envelopes carrying `clientId` answer a call this server made;
//! - everything else is a fresh call for a registered action.
//!
//! Failures inside a task become error envelopes; they never end the read
//! loop or affect other calls on the connection.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio::time::Duration;
use tracing::Instrument;

use wirecall_core::{Envelope, Payload, RpcError};

use crate::context::CallContext;
use crate::correlation::{CallKey, CorrelationTable};
use crate::dispatch::action::ActionOutput;
use crate::dispatch::invoke;
use crate::dispatch::proxy::{ClientActions, ClientCallResult, PendingTable};
use crate::dispatch::registry::ActionRegistry;
use crate::transport::Transport;

/// Tunables for one connection.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub call_timeout: Duration,
    pub drain_timeout: Duration,
    pub max_frame_bytes: usize,
    pub max_pending_attachments: usize,
    pub outbound_queue: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            drain_timeout: Duration::from_secs(5),
            max_frame_bytes: wirecall_core::protocol::frame::DEFAULT_MAX_FRAME_BYTES,
            max_pending_attachments: wirecall_core::protocol::attachment::DEFAULT_MAX_PENDING,
            outbound_queue: 1024,
        }
    }
}

/// Connection-scoped protocol state: one transport, one correlation table.
pub struct DispatchEngine {
    registry: Arc<ActionRegistry>,
    transport: Arc<dyn Transport>,
    pending: Arc<PendingTable>,
    ctx: CallContext,
    drain_timeout: Duration,
}

impl DispatchEngine {
    pub fn new(
        registry: Arc<ActionRegistry>,
        transport: Arc<dyn Transport>,
        ctx: CallContext,
        settings: &EngineSettings,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            transport,
            pending: Arc::new(CorrelationTable::new(settings.call_timeout)),
            ctx,
            drain_timeout: settings.drain_timeout,
        })
    }

    pub fn context(&self) -> &CallContext {
        &self.ctx
    }

    /// Outstanding server-initiated calls.
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    /// Read until the channel closes, then drain in-flight calls and close
    /// the transport.
    pub async fn run(self: Arc<Self>) {
        self.run_until(std::future::pending()).await
    }

    /// Like [`run`](Self::run), but stop reading as soon as `shutdown`
    /// resolves. Calls already read still finish within the drain timeout.
    pub async fn run_until<F>(self: Arc<Self>, shutdown: F)
    where
        F: Future<Output = ()> + Send,
    {
        let sweeper = self.pending.spawn_sweeper();
        let mut tasks = JoinSet::new();
        tracing::info!(conn = %self.ctx.connection_id(), kind = %self.ctx.kind(), "connection opened");

        tokio::pin!(shutdown);
        loop {
            let env = tokio::select! {
                env = self.transport.read() => env,
                _ = &mut shutdown => {
                    tracing::info!(in_flight = tasks.len(), "server draining; connection stops reading");
                    None
                }
            };
            let Some(env) = env else {
                break;
            };

            let engine = Arc::clone(&self);
            let span = tracing::debug_span!("call", action = %env.action, id = %env.id);
            tasks.spawn(async move { engine.dispatch(env).await }.instrument(span));

            while let Some(done) = tasks.try_join_next() {
                if let Err(e) = done {
                    tracing::warn!(error = %e, "dispatch task failed");
                }
            }
        }

        let in_flight = tasks.len();
        let drained = tokio::time::timeout(self.drain_timeout, async {
            while let Some(done) = tasks.join_next().await {
                if let Err(e) = done {
                    tracing::warn!(error = %e, "dispatch task failed");
                }
            }
        })
        .await
        .is_ok();
        if !drained {
            tracing::warn!(remaining = tasks.len(), "drain timeout; in-flight calls left running");
            tasks.detach_all();
        }

        sweeper.abort();
        let abandoned = self.pending.expire_all();
        self.transport.close().await;
        tracing::info!(in_flight, abandoned, "connection closed");
    }

    /// Route one inbound envelope.
    pub async fn dispatch(&self, env: Envelope) {
        match env.client_id.clone() {
            Some(client_id) => self.resolve_response(client_id, env).await,
            None => self.execute(env).await,
        }
    }

    async fn send(&self, env: Envelope) {
        if let Err(e) = self.transport.write(&env).await {
            tracing::debug!(action = %env.action, id = %env.id, error = %e, "response discarded");
        }
    }

    async fn resolve_response(&self, client_id: String, env: Envelope) {
        let key = CallKey::new(client_id, env.id.clone());
        let Some(pending) = self.pending.take(&key) else {
            tracing::debug!(client_id = %key.client_id, id = %key.id, "response for unknown or expired call");
            self.send(env.error_reply(RpcError::timeout(format!(
                "no pending call {} for client action {}",
                key.id, env.action
            ))))
            .await;
            return;
        };

        let result = self.check_response(&pending.action, &env);
        pending.resolve(result);
    }

    /// Validate a client's answer against the declared return model.
    fn check_response(&self, action: &str, env: &Envelope) -> ClientCallResult {
        if env.is_error() {
            let err = env
                .error
                .clone()
                .unwrap_or_else(|| RpcError::generic(format!("client action {action} failed")));
            return ClientCallResult::Err(err);
        }

        let returns = self.registry.client_action(action).and_then(|s| s.returns);
        match (env.payload(), returns) {
            (Some(Payload::Json(v)), Some(model)) => match model.parse(&v) {
                Ok(parsed) => ClientCallResult::Ok(Some(Payload::Json(parsed))),
                Err(issues) => ClientCallResult::Err(RpcError::validation(issues)),
            },
            (None, Some(model)) => match model.parse(&serde_json::Value::Null) {
                Ok(parsed) => ClientCallResult::Ok(Some(Payload::Json(parsed))),
                Err(issues) => ClientCallResult::Err(RpcError::validation(issues)),
            },
            (payload, _) => ClientCallResult::Ok(payload),
        }
    }

    async fn execute(&self, env: Envelope) {
        let client = ClientActions::bound(
            &env.id,
            Arc::clone(&self.transport),
            Arc::clone(&self.pending),
            Arc::clone(&self.registry),
        );
        let (action, call) = match invoke::prepare(&self.registry, &env, self.ctx.clone(), client) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::debug!(kind = %e.kind, "call rejected");
                self.send(env.error_reply(e)).await;
                return;
            }
        };

        let items = match invoke::run_guarded(&action, call).await {
            Ok(ActionOutput::Single(p)) => {
                self.send(env.ok_chunk(Some(p), true)).await;
                return;
            }
            Ok(ActionOutput::Stream(items)) => items,
            Err(e) => {
                tracing::debug!(kind = %e.kind, code = e.code, "action failed");
                self.send(env.error_reply(e)).await;
                return;
            }
        };

        // One item of lookahead: a chunk is only known to be last once the
        // stream has ended.
        let mut items = items;
        let mut held: Option<Payload> = None;
        while let Some(item) = invoke::next_guarded(&env.action, &mut items).await {
            match item {
                Ok(p) => {
                    if let Some(prev) = held.replace(p) {
                        self.send(env.ok_chunk(Some(prev), false)).await;
                    }
                }
                Err(e) => {
                    tracing::debug!(kind = %e.kind, code = e.code, "stream failed");
                    if let Some(prev) = held.take() {
                        self.send(env.ok_chunk(Some(prev), false)).await;
                    }
                    self.send(env.error_reply(e)).await;
                    return;
                }
            }
        }
        self.send(env.ok_chunk(held, true)).await;
    }
}
