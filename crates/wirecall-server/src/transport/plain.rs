//! Plain (non-streaming) mode.
//!
//! One request names any number of actions; they run concurrently and the
//! response is a single JSON object keyed by action name:
//! - `GET  /rpc?getUser={"id":"42"}&ping=` (values are JSON; anything that is
//!   not JSON is taken as a string, empty means no parameters)
//! - `POST /rpc` with `{"getUser": {"id": "42"}, "ping": null}`
//!
//! Streamed outputs are collected into an array. Client actions are not
//! reachable from here.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::future::join_all;
use serde_json::{json, Map, Value};

use wirecall_core::{Envelope, Payload, RpcError};

use crate::app_state::AppState;
use crate::context::{self, CallContext, TransportKind};
use crate::dispatch::{next_guarded, prepare, run_guarded, ActionOutput, ActionRegistry, ClientActions};
use crate::transport::http::{draining_response, rejection_response};

pub async fn plain_get(
    State(app): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    let calls = q
        .into_iter()
        .map(|(action, raw)| {
            let params = if raw.is_empty() {
                Value::Null
            } else {
                serde_json::from_str(&raw).unwrap_or(Value::String(raw))
            };
            (action, params)
        })
        .collect();
    respond(&app, &headers, calls).await
}

pub async fn plain_post(
    State(app): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    respond(&app, &headers, body.into_iter().collect()).await
}

async fn respond(app: &AppState, headers: &HeaderMap, calls: Vec<(String, Value)>) -> Response {
    if app.is_draining() {
        return draining_response();
    }
    let registry = app.registry();
    let ctx = match context::establish(&registry, TransportKind::Plain, headers) {
        Ok(ctx) => ctx,
        Err(e) => return rejection_response(e),
    };
    Json(fan_out(&registry, &ctx, calls).await).into_response()
}

/// Run every call and key the outcomes by action name.
pub async fn fan_out(
    registry: &ActionRegistry,
    ctx: &CallContext,
    calls: Vec<(String, Value)>,
) -> Map<String, Value> {
    let futs = calls.into_iter().enumerate().map(|(i, (action, params))| {
        let ctx = ctx.clone();
        async move {
            let env = Envelope::call(format!("plain-{i}"), action.clone(), Payload::Json(params));
            let outcome = match invoke_one(registry, &env, ctx).await {
                Ok(data) => json!({ "status": "ok", "data": data }),
                Err(e) => json!({ "status": "error", "error": e }),
            };
            (action, outcome)
        }
    });
    join_all(futs).await.into_iter().collect()
}

async fn invoke_one(registry: &ActionRegistry, env: &Envelope, ctx: CallContext) -> Result<Value, RpcError> {
    let (action, call) = prepare(registry, env, ctx, ClientActions::unavailable())?;
    match run_guarded(&action, call).await? {
        ActionOutput::Single(p) => Ok(p.to_json()),
        ActionOutput::Stream(mut items) => {
            let mut out = Vec::new();
            while let Some(item) = next_guarded(&env.action, &mut items).await {
                out.push(item?.to_json());
            }
            Ok(Value::Array(out))
        }
    }
}
