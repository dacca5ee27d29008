//! Client-call proxy: server-initiated calls into the client.
//!
//! A `ClientActions` handle is bound to the call that created it. Every
//! outbound call reuses that call's `id`, is stamped with the target action's
//! `clientId`, and parks a resolver in the connection's correlation table
//! until the client answers or the entry expires.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::oneshot;

use wirecall_core::{Envelope, Payload, RpcError};

use crate::correlation::{CallKey, CorrelationTable};
use crate::dispatch::registry::ActionRegistry;
use crate::transport::Transport;

/// Outcome of a client call. Never raised; callers decide what an error means.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCallResult {
    Ok(Option<Payload>),
    Err(RpcError),
}

impl ClientCallResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, ClientCallResult::Ok(_))
    }

    pub fn into_result(self) -> Result<Option<Payload>, RpcError> {
        match self {
            ClientCallResult::Ok(p) => Ok(p),
            ClientCallResult::Err(e) => Err(e),
        }
    }

    /// `{status: "ok", data}` / `{status: "error", error}`.
    pub fn to_json(&self) -> Value {
        match self {
            ClientCallResult::Ok(p) => json!({
                "status": "ok",
                "data": p.as_ref().map(Payload::to_json),
            }),
            ClientCallResult::Err(e) => json!({ "status": "error", "error": e }),
        }
    }
}

/// Resolver parked in the correlation table for one outbound call.
pub struct PendingCall {
    pub action: String,
    resolver: oneshot::Sender<ClientCallResult>,
}

impl PendingCall {
    pub fn new(action: impl Into<String>) -> (Self, oneshot::Receiver<ClientCallResult>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                action: action.into(),
                resolver: tx,
            },
            rx,
        )
    }

    pub fn resolve(self, result: ClientCallResult) {
        // receiver gone means the awaiting action already finished
        let _ = self.resolver.send(result);
    }
}

pub type PendingTable = CorrelationTable<CallKey, PendingCall>;

#[derive(Clone)]
struct Link {
    call_id: String,
    transport: Arc<dyn Transport>,
    pending: Arc<PendingTable>,
    registry: Arc<ActionRegistry>,
}

/// Per-call handle for calling client actions.
#[derive(Clone)]
pub struct ClientActions {
    link: Option<Link>,
}

impl ClientActions {
    pub(crate) fn bound(
        call_id: &str,
        transport: Arc<dyn Transport>,
        pending: Arc<PendingTable>,
        registry: Arc<ActionRegistry>,
    ) -> Self {
        Self {
            link: Some(Link {
                call_id: call_id.to_string(),
                transport,
                pending,
                registry,
            }),
        }
    }

    /// Handle for surfaces without a return channel (plain mode).
    pub fn unavailable() -> Self {
        Self { link: None }
    }

    /// Bound call for one declared client action; `None` when the name is
    /// undeclared or the surface has no return channel.
    pub fn bind(&self, action: &str) -> Option<ClientAction> {
        let link = self.link.as_ref()?;
        link.registry.client_action(action)?;
        Some(ClientAction {
            actions: self.clone(),
            name: action.to_string(),
        })
    }

    /// Call `action` on the client and wait for its answer or expiry.
    pub async fn call(&self, action: &str, data: impl Into<Payload>) -> ClientCallResult {
        let Some(link) = &self.link else {
            return ClientCallResult::Err(RpcError::generic(
                "client actions are not available on this transport",
            ));
        };
        let Some(spec) = link.registry.client_action(action) else {
            return ClientCallResult::Err(RpcError::not_found(action));
        };

        let key = CallKey::new(spec.client_id.clone(), link.call_id.clone());
        let (pending, rx) = PendingCall::new(action);
        let timeout_ms = link.pending.timeout().as_millis();
        let expired_action = action.to_string();
        let added = link.pending.add(key.clone(), pending, move |p| {
            p.resolve(ClientCallResult::Err(RpcError::timeout(format!(
                "client action {expired_action} did not answer within {timeout_ms}ms"
            ))));
        });
        if !added {
            return ClientCallResult::Err(RpcError::generic(format!(
                "a call to client action {action} is already pending for call {}",
                link.call_id
            )));
        }

        let env = Envelope::call(link.call_id.clone(), action, data.into())
            .with_client_id(spec.client_id);
        if let Err(e) = link.transport.write(&env).await {
            link.pending.delete(&key);
            tracing::debug!(action, error = %e, "client call write failed");
            return ClientCallResult::Err(e.into());
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => ClientCallResult::Err(RpcError::generic("client call abandoned")),
        }
    }
}

/// One client action bound to its originating call.
#[derive(Clone)]
pub struct ClientAction {
    actions: ClientActions,
    name: String,
}

impl ClientAction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn call(&self, data: impl Into<Payload>) -> ClientCallResult {
        self.actions.call(&self.name, data).await
    }
}
