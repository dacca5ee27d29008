use std::sync::Arc;

use dashmap::DashMap;

use crate::context::ContextHook;
use crate::dispatch::action::Action;
use crate::dispatch::model::Model;

/// A client-callable action declared by the server.
#[derive(Clone)]
pub struct ClientActionSpec {
    pub name: String,
    /// Stable per action name (`c-<name>`), stamped on every call to it.
    pub client_id: String,
    /// Model the client's response data must satisfy.
    pub returns: Option<Arc<dyn Model>>,
}

/// Action table shared by every connection.
///
/// Registration goes through `&self` so the registry can be shared behind an
/// `Arc` while services are still being added.
#[derive(Default)]
pub struct ActionRegistry {
    actions: DashMap<String, Arc<dyn Action>>,
    client_actions: DashMap<String, ClientActionSpec>,
    hook: Option<Arc<dyn ContextHook>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hook(mut self, hook: Arc<dyn ContextHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn hook(&self) -> Option<&Arc<dyn ContextHook>> {
        self.hook.as_ref()
    }

    pub fn register(&self, action: Arc<dyn Action>) {
        let name = action.name().to_string();
        if self.actions.insert(name.clone(), action).is_some() {
            tracing::warn!(action = %name, "action re-registered; previous handler replaced");
        }
    }

    /// Declare an action the server may call on the client.
    pub fn declare_client_action(&self, name: &str, returns: Option<Arc<dyn Model>>) {
        let spec = ClientActionSpec {
            name: name.to_string(),
            client_id: format!("c-{name}"),
            returns,
        };
        self.client_actions.insert(name.to_string(), spec);
    }

    pub fn action(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).map(|e| Arc::clone(e.value()))
    }

    pub fn client_action(&self, name: &str) -> Option<ClientActionSpec> {
        self.client_actions.get(name).map(|e| e.value().clone())
    }

    pub fn action_names(&self) -> Vec<String> {
        let mut v: Vec<String> = self.actions.iter().map(|e| e.key().clone()).collect();
        v.sort();
        v
    }

    pub fn client_action_names(&self) -> Vec<String> {
        let mut v: Vec<String> = self.client_actions.iter().map(|e| e.key().clone()).collect();
        v.sort();
        v
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::dispatch::action::{from_fn, ActionOutput};

    #[test]
    fn reserved_names_are_plain_misses() {
        let reg = ActionRegistry::new();
        reg.register(from_fn("echo", None, |c| async move { ActionOutput::json(c.params) }));
        for name in ["__proto__", "constructor", "toString", "hasOwnProperty"] {
            assert!(reg.action(name).is_none(), "{name}");
        }
        assert!(reg.action("echo").is_some());
    }

    #[test]
    fn client_ids_are_stable_per_name() {
        let reg = ActionRegistry::new();
        reg.declare_client_action("notify", None);
        let a = reg.client_action("notify").unwrap();
        reg.declare_client_action("notify", None);
        let b = reg.client_action("notify").unwrap();
        assert_eq!(a.client_id, "c-notify");
        assert_eq!(a.client_id, b.client_id);
        assert_eq!(reg.client_action_names(), ["notify"]);
    }
}
