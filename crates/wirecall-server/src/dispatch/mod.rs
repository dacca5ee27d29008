//! Dispatch layer: action table, per-connection engine, client-call proxy.
//!
//! Re-exports the pieces embedding applications need to register actions
//! and drive a connection.

pub mod action;
pub mod engine;
mod invoke;
pub mod model;
pub mod proxy;
pub mod registry;

pub use action::{from_fn, Action, ActionCall, ActionOutput};
pub use engine::{DispatchEngine, EngineSettings};
pub use model::{FieldType, Model, ObjectModel, TypedModel};
pub use proxy::{ClientAction, ClientActions, ClientCallResult};
pub use registry::{ActionRegistry, ClientActionSpec};

pub(crate) use invoke::{next_guarded, prepare, run_guarded};
