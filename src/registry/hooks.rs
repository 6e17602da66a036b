//! Named hooks and handlers referenced by task schemas.
//!
//! Schemas carry only names; the harness registers the actual callables
//! here before the registry is built, and the build fails if any name has
//! no registration. Resolution never happens by reflection.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

/// Read-only view of a task handed to hooks and handlers.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    /// Identifier of the executing task.
    pub task_id: &'a str,
    /// The task's collected field values.
    pub fields: &'a BTreeMap<String, Value>,
    /// Session scratch facts.
    pub scratch: &'a BTreeMap<String, Value>,
}

/// A named callable run before or after the execution action.
///
/// A pre-hook error fails the task without invoking the action. A post-hook
/// error is logged but leaves the task done, since the action has already
/// run.
pub type Hook = Arc<dyn Fn(&HookContext<'_>) -> Result<(), String> + Send + Sync>;

/// What an internal handler produced.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerOutcome {
    /// Reply text shown to the user.
    pub reply: String,
    /// Structured result payload.
    pub payload: Value,
    /// Derived facts merged into the session scratch map.
    pub facts: BTreeMap<String, Value>,
}

impl HandlerOutcome {
    /// An outcome with just a reply and no payload or facts.
    #[must_use]
    pub fn reply(text: impl Into<String>) -> Self {
        Self { reply: text.into(), payload: Value::Null, facts: BTreeMap::new() }
    }
}

/// A named callable that fulfils an internally bound task.
pub type Handler = Arc<dyn Fn(&HookContext<'_>) -> Result<HandlerOutcome, String> + Send + Sync>;

/// Registry of hook and handler callables, keyed by name.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: BTreeMap<String, Hook>,
    handlers: BTreeMap<String, Handler>,
}

impl HookRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook under the given name, replacing any previous one.
    pub fn register_hook(
        &mut self,
        name: impl Into<String>,
        hook: impl Fn(&HookContext<'_>) -> Result<(), String> + Send + Sync + 'static,
    ) {
        self.hooks.insert(name.into(), Arc::new(hook));
    }

    /// Registers a handler under the given name, replacing any previous one.
    pub fn register_handler(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&HookContext<'_>) -> Result<HandlerOutcome, String> + Send + Sync + 'static,
    ) {
        self.handlers.insert(name.into(), Arc::new(handler));
    }

    /// Looks up a hook by name.
    #[must_use]
    pub fn hook(&self, name: &str) -> Option<&Hook> {
        self.hooks.get(name)
    }

    /// Looks up a handler by name.
    #[must_use]
    pub fn handler(&self, name: &str) -> Option<&Handler> {
        self.handlers.get(name)
    }

    /// Whether a hook with this name is registered.
    #[must_use]
    pub fn has_hook(&self, name: &str) -> bool {
        self.hooks.contains_key(name)
    }

    /// Whether a handler with this name is registered.
    #[must_use]
    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl std::fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HookRegistry")
            .field("hooks", &self.hooks.keys().collect::<Vec<_>>())
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
