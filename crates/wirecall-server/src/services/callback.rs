use std::sync::Arc;

use async_trait::async_trait;

use wirecall_core::{Payload, RpcError};

use crate::dispatch::{
    Action, ActionCall, ActionOutput, ClientCallResult, FieldType, Model, ObjectModel,
};

/// Client action called by `ping_client`.
pub const NOTIFY: &str = "notify";

/// Shape a client's `notify` answer must have.
pub fn notify_model() -> Arc<dyn Model> {
    Arc::new(ObjectModel::new().required("ack", FieldType::Boolean).allow_extra())
}

/// Forwards its parameters to the client's `notify` action and returns the
/// client's answer as `{status, data | error}`.
pub struct PingClientAction;

#[async_trait]
impl Action for PingClientAction {
    fn name(&self) -> &str {
        "ping_client"
    }

    async fn run(&self, call: ActionCall) -> Result<ActionOutput, RpcError> {
        let result = match call.client.bind(NOTIFY) {
            Some(notify) => notify.call(Payload::Json(call.params)).await,
            None => ClientCallResult::Err(RpcError::generic(
                "client action notify is not reachable on this connection",
            )),
        };
        if !result.is_ok() {
            tracing::debug!(?result, "client notify failed");
        }
        ActionOutput::json(result.to_json())
    }
}
