//! Call preparation and guarded execution shared by the engine and plain mode.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::stream::BoxStream;
use futures_util::{FutureExt, StreamExt};
use serde_json::Value;

use wirecall_core::{Envelope, Payload, RpcError};

use crate::context::CallContext;
use crate::dispatch::action::{Action, ActionCall, ActionOutput};
use crate::dispatch::proxy::ClientActions;
use crate::dispatch::registry::ActionRegistry;

/// Resolve the action and validate its parameters.
pub(crate) fn prepare(
    registry: &ActionRegistry,
    env: &Envelope,
    ctx: CallContext,
    client: ClientActions,
) -> Result<(Arc<dyn Action>, ActionCall), RpcError> {
    let action = registry
        .action(&env.action)
        .ok_or_else(|| RpcError::not_found(&env.action))?;

    let raw = env.data.clone().unwrap_or(Value::Null);
    let params = match action.params() {
        // binary calls carry a placeholder in `data`, not parameters
        Some(model) if env.binary.is_none() => model.parse(&raw).map_err(RpcError::validation)?,
        _ => raw,
    };

    Ok((
        action,
        ActionCall {
            params,
            binary: env.binary.clone(),
            ctx,
            client,
        },
    ))
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn panicked(action: &str, payload: Box<dyn std::any::Any + Send>) -> RpcError {
    let msg = panic_message(payload);
    tracing::error!(action, panic = %msg, "action panicked");
    RpcError::with_code(500, format!("action {action} panicked"))
}

/// Run an action, turning a panic into a 500 error.
pub(crate) async fn run_guarded(
    action: &Arc<dyn Action>,
    call: ActionCall,
) -> Result<ActionOutput, RpcError> {
    match AssertUnwindSafe(action.run(call)).catch_unwind().await {
        Ok(out) => out,
        Err(payload) => Err(panicked(action.name(), payload)),
    }
}

/// Pull the next stream item, turning a panic into a terminal error.
pub(crate) async fn next_guarded(
    action: &str,
    items: &mut BoxStream<'static, Result<Payload, RpcError>>,
) -> Option<Result<Payload, RpcError>> {
    match AssertUnwindSafe(items.next()).catch_unwind().await {
        Ok(item) => item,
        Err(payload) => Some(Err(panicked(action, payload))),
    }
}
