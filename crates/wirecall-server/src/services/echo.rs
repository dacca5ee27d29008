use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use wirecall_core::RpcError;

use crate::dispatch::{Action, ActionCall, ActionOutput, Model, TypedModel};

/// Returns its parameters unchanged.
pub struct EchoAction;

#[async_trait]
impl Action for EchoAction {
    fn name(&self) -> &str {
        "echo"
    }

    async fn run(&self, call: ActionCall) -> Result<ActionOutput, RpcError> {
        ActionOutput::json(call.params)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct UserRef {
    id: String,
}

/// Looks a user up by id. There is no user store, so the reference is
/// returned as-is once it validated.
pub struct GetUserAction {
    params: Arc<dyn Model>,
}

impl GetUserAction {
    pub fn new() -> Self {
        Self {
            params: Arc::new(TypedModel::<UserRef>::new()),
        }
    }
}

impl Default for GetUserAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Action for GetUserAction {
    fn name(&self) -> &str {
        "getUser"
    }

    fn params(&self) -> Option<Arc<dyn Model>> {
        Some(Arc::clone(&self.params))
    }

    async fn run(&self, call: ActionCall) -> Result<ActionOutput, RpcError> {
        let user: UserRef = serde_json::from_value(call.params)?;
        if user.id.is_empty() {
            return Err(RpcError::with_code(404, "user id must not be empty"));
        }
        ActionOutput::json(user)
    }
}
