use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use serde::Serialize;
use serde_json::Value;

use wirecall_core::{Payload, RpcError};

use crate::context::CallContext;
use crate::dispatch::model::Model;
use crate::dispatch::proxy::ClientActions;

/// Everything an action receives for one call.
pub struct ActionCall {
    /// Parameters, already normalized by the action's model when it has one.
    pub params: Value,
    /// Binary attachment sent with the call, if any.
    pub binary: Option<Bytes>,
    pub ctx: CallContext,
    /// Handle for calling back into the peer.
    pub client: ClientActions,
}

/// What an action produced.
pub enum ActionOutput {
    Single(Payload),
    /// Finite, non-restartable sequence; one response frame per item.
    Stream(BoxStream<'static, Result<Payload, RpcError>>),
}

impl ActionOutput {
    pub fn json<T: Serialize>(v: T) -> Result<Self, RpcError> {
        Ok(ActionOutput::Single(Payload::Json(serde_json::to_value(v)?)))
    }

    pub fn binary(b: impl Into<Bytes>) -> Self {
        ActionOutput::Single(Payload::Binary(b.into()))
    }

    pub fn stream<S>(s: S) -> Self
    where
        S: Stream<Item = Result<Payload, RpcError>> + Send + 'static,
    {
        ActionOutput::Stream(s.boxed())
    }

    /// Stream from an already materialized sequence.
    pub fn from_values<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: Send + 'static,
    {
        ActionOutput::Stream(stream::iter(items.into_iter().map(|v| Ok(Payload::Json(v)))).boxed())
    }
}

/// A server-side action.
#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &str;

    /// Parameter model; `None` passes `data` through untouched.
    fn params(&self) -> Option<Arc<dyn Model>> {
        None
    }

    async fn run(&self, call: ActionCall) -> Result<ActionOutput, RpcError>;
}

/// Action built from an async closure.
pub struct FnAction<F> {
    name: String,
    params: Option<Arc<dyn Model>>,
    f: F,
}

#[async_trait]
impl<F, Fut> Action for FnAction<F>
where
    F: Fn(ActionCall) -> Fut + Send + Sync,
    Fut: Future<Output = Result<ActionOutput, RpcError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn params(&self) -> Option<Arc<dyn Model>> {
        self.params.clone()
    }

    async fn run(&self, call: ActionCall) -> Result<ActionOutput, RpcError> {
        (self.f)(call).await
    }
}

pub fn from_fn<F, Fut>(name: &str, params: Option<Arc<dyn Model>>, f: F) -> Arc<dyn Action>
where
    F: Fn(ActionCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ActionOutput, RpcError>> + Send + 'static,
{
    Arc::new(FnAction {
        name: name.to_string(),
        params,
        f,
    })
}
