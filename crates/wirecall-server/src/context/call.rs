use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::HeaderMap;
use serde_json::Value;

use wirecall_core::RpcError;

use crate::dispatch::ActionRegistry;

/// Hook-provided key/value attributes visible to actions.
pub type Attributes = HashMap<String, Value>;

/// Which surface a connection came in on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Duplex HTTP body.
    Stream,
    /// WebSocket.
    Socket,
    /// One-shot fan-out request.
    Plain,
}

impl TransportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Stream => "stream",
            TransportKind::Socket => "socket",
            TransportKind::Plain => "plain",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Called once per physical connection before any frame is read.
///
/// Returning an error rejects the connection; the error's `code` becomes the
/// HTTP status when it is a valid one.
pub trait ContextHook: Send + Sync {
    fn on_connect(
        &self,
        kind: TransportKind,
        headers: &HeaderMap,
        attrs: &mut Attributes,
    ) -> Result<(), RpcError>;
}

/// Immutable per-connection metadata handed to actions.
#[derive(Clone)]
pub struct CallContext {
    connection_id: Arc<str>,
    kind: TransportKind,
    headers: Arc<HeaderMap>,
    attrs: Arc<Attributes>,
}

impl CallContext {
    pub fn new(kind: TransportKind, headers: HeaderMap, attrs: Attributes) -> Self {
        Self {
            connection_id: uuid::Uuid::new_v4().simple().to_string().into(),
            kind,
            headers: Arc::new(headers),
            attrs: Arc::new(attrs),
        }
    }

    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }
    pub fn kind(&self) -> TransportKind {
        self.kind
    }
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("connection_id", &self.connection_id)
            .field("kind", &self.kind)
            .field("attrs", &self.attrs)
            .finish()
    }
}

/// Build the context for a new connection, running the registry's hook.
pub fn establish(
    registry: &ActionRegistry,
    kind: TransportKind,
    headers: &HeaderMap,
) -> Result<CallContext, RpcError> {
    let mut attrs = Attributes::new();
    if let Some(hook) = registry.hook() {
        hook.on_connect(kind, headers, &mut attrs)?;
    }
    Ok(CallContext::new(kind, headers.clone(), attrs))
}
