//! Lifecycle hooks fired after successful store calls.
//!
//! Hooks observe; they receive JSON snapshots and cannot change the outcome
//! of the operation that fired them.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// What a hook sees: the caller's arguments, the operation result and the
/// raw store request.
#[derive(Debug, Clone, PartialEq)]
pub struct HookEvent {
    pub type_name: String,
    pub args: Value,
    pub result: Value,
    pub request: Value,
}

type Hook = Arc<dyn Fn(&HookEvent) + Send + Sync>;

#[derive(Clone, Default)]
pub struct Hooks {
    on_get: Option<Hook>,
    on_put: Option<Hook>,
    on_delete: Option<Hook>,
    on_query: Option<Hook>,
    on_dangerously_update: Option<Hook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_get", &self.on_get.is_some())
            .field("on_put", &self.on_put.is_some())
            .field("on_delete", &self.on_delete.is_some())
            .field("on_query", &self.on_query.is_some())
            .field("on_dangerously_update", &self.on_dangerously_update.is_some())
            .finish()
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_get(mut self, hook: impl Fn(&HookEvent) + Send + Sync + 'static) -> Self {
        self.on_get = Some(Arc::new(hook));
        self
    }

    pub fn on_put(mut self, hook: impl Fn(&HookEvent) + Send + Sync + 'static) -> Self {
        self.on_put = Some(Arc::new(hook));
        self
    }

    pub fn on_delete(mut self, hook: impl Fn(&HookEvent) + Send + Sync + 'static) -> Self {
        self.on_delete = Some(Arc::new(hook));
        self
    }

    pub fn on_query(mut self, hook: impl Fn(&HookEvent) + Send + Sync + 'static) -> Self {
        self.on_query = Some(Arc::new(hook));
        self
    }

    /// Fired after a read-modify-write update. The update is not atomic.
    pub fn on_dangerously_update(
        mut self,
        hook: impl Fn(&HookEvent) + Send + Sync + 'static,
    ) -> Self {
        self.on_dangerously_update = Some(Arc::new(hook));
        self
    }

    pub(crate) fn fire_get(&self, event: impl FnOnce() -> HookEvent) {
        fire(&self.on_get, event);
    }

    pub(crate) fn fire_put(&self, event: impl FnOnce() -> HookEvent) {
        fire(&self.on_put, event);
    }

    pub(crate) fn fire_delete(&self, event: impl FnOnce() -> HookEvent) {
        fire(&self.on_delete, event);
    }

    pub(crate) fn fire_query(&self, event: impl FnOnce() -> HookEvent) {
        fire(&self.on_query, event);
    }

    pub(crate) fn fire_update(&self, event: impl FnOnce() -> HookEvent) {
        fire(&self.on_dangerously_update, event);
    }
}

// Snapshots are only built when a hook is registered.
fn fire(hook: &Option<Hook>, event: impl FnOnce() -> HookEvent) {
    if let Some(hook) = hook {
        hook(&event());
    }
}
