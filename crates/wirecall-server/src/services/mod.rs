//! Built-in actions.
//!
//! Small, dependency-free actions the binary registers by default. They
//! double as smoke tests for every response shape: single value, stream,
//! binary in both directions, and a server-to-client callback.

mod binary;
mod callback;
mod count;
mod echo;

use std::sync::Arc;

pub use binary::{ReverseAction, UploadAction};
pub use callback::{notify_model, PingClientAction, NOTIFY};
pub use count::CountAction;
pub use echo::{EchoAction, GetUserAction};

use crate::dispatch::ActionRegistry;

/// Register every built-in action and declare the client actions they call.
pub fn register_builtin(registry: &ActionRegistry) {
    registry.register(Arc::new(EchoAction));
    registry.register(Arc::new(GetUserAction::new()));
    registry.register(Arc::new(CountAction::new()));
    registry.register(Arc::new(UploadAction));
    registry.register(Arc::new(ReverseAction));
    registry.register(Arc::new(PingClientAction));
    registry.declare_client_action(NOTIFY, Some(notify_model()));
}
