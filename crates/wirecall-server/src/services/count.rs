use std::sync::Arc;

use async_trait::async_trait;
use futures_util::stream;
use serde_json::{json, Value};
use tokio::time::Duration;

use wirecall_core::{Payload, RpcError};

use crate::dispatch::{Action, ActionCall, ActionOutput, FieldType, Model, ObjectModel};

const MAX_COUNT: u64 = 10_000;

/// Streams `1..=n`, optionally pausing `delay_ms` between items.
pub struct CountAction {
    params: Arc<dyn Model>,
}

impl CountAction {
    pub fn new() -> Self {
        let params = ObjectModel::new()
            .required("n", FieldType::Integer)
            .optional("delay_ms", FieldType::Integer);
        Self {
            params: Arc::new(params),
        }
    }
}

impl Default for CountAction {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Action for CountAction {
    fn name(&self) -> &str {
        "count"
    }

    fn params(&self) -> Option<Arc<dyn Model>> {
        Some(Arc::clone(&self.params))
    }

    async fn run(&self, call: ActionCall) -> Result<ActionOutput, RpcError> {
        let n = call.params.get("n").and_then(Value::as_u64).unwrap_or(0);
        if n > MAX_COUNT {
            return Err(RpcError::generic(format!("n must be at most {MAX_COUNT}")));
        }
        let delay = call
            .params
            .get("delay_ms")
            .and_then(Value::as_u64)
            .map(Duration::from_millis);

        let items = stream::unfold(1u64, move |i| async move {
            if i > n {
                return None;
            }
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            Some((Ok(Payload::Json(json!(i))), i + 1))
        });
        Ok(ActionOutput::stream(items))
    }
}
