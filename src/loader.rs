use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::info;

use crate::errors::TabhubError;
use crate::events::{EventKind, SubscriptionId, TabEvent};
use crate::registry::Registry;
use crate::tab::Tab;
use crate::types::OpenOptions;

/// An isolated instance of the tabs API.
///
/// Every subscription registered through an instance is owned by it:
/// [`unload`](Self::unload) revokes exactly that set, leaving registry-level
/// handlers and other instances untouched. A revoked handler never fires
/// again, even for an emission already dispatching when the unload happens.
/// After unload the instance is permanently dead; its operations return
/// [`TabhubError::ModuleUnloaded`].
pub struct TabsModule {
    registry: Registry,
    scope: Mutex<Vec<SubscriptionId>>,
    unloaded: AtomicBool,
}

impl TabsModule {
    pub(crate) fn new(registry: Registry) -> Self {
        Self {
            registry,
            scope: Mutex::new(Vec::new()),
            unloaded: AtomicBool::new(false),
        }
    }

    fn ensure_loaded(&self) -> Result<(), TabhubError> {
        if self.unloaded.load(Ordering::SeqCst) {
            Err(TabhubError::ModuleUnloaded)
        } else {
            Ok(())
        }
    }

    /// The shared registry this instance operates on
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn is_unloaded(&self) -> bool {
        self.unloaded.load(Ordering::SeqCst)
    }

    /// Register a persistent handler scoped to this instance
    pub fn on(
        &self,
        kind: EventKind,
        handler: impl Fn(&TabEvent) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, TabhubError> {
        self.ensure_loaded()?;
        let id = self.registry.bus().on(kind, handler);
        self.scope.lock().push(id);
        Ok(id)
    }

    /// Register a one-shot handler scoped to this instance
    pub fn once(
        &self,
        kind: EventKind,
        handler: impl Fn(&TabEvent) + Send + Sync + 'static,
    ) -> Result<SubscriptionId, TabhubError> {
        self.ensure_loaded()?;
        let id = self.registry.bus().once(kind, handler);
        self.scope.lock().push(id);
        Ok(id)
    }

    /// Unregister a handler registered through this instance; no-op if
    /// already removed
    pub fn remove_listener(&self, id: SubscriptionId) -> bool {
        self.scope.lock().retain(|s| *s != id);
        self.registry.bus().remove_listener(id)
    }

    /// Open a tab through this instance
    pub async fn open(&self, options: impl Into<OpenOptions>) -> Result<Tab, TabhubError> {
        self.ensure_loaded()?;
        self.registry.open(options).await
    }

    /// Revoke every subscription owned by this instance and mark it dead.
    /// Idempotent.
    pub fn unload(&self) {
        if self.unloaded.swap(true, Ordering::SeqCst) {
            return;
        }
        let scope: Vec<SubscriptionId> = self.scope.lock().drain(..).collect();
        info!(subscriptions = scope.len(), "unloading module instance");
        for id in scope {
            self.registry.bus().revoke(id);
        }
    }
}

impl Drop for TabsModule {
    fn drop(&mut self) {
        self.unload();
    }
}

#[cfg(test)]
#[path = "loader_test.rs"]
mod loader_test;
