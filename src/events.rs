use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::types::TabInfo;

/// Lifecycle events a subscriber can observe
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A tab was inserted into the registry
    Open,
    /// A navigation completed; title, url, and favicon are final
    Ready,
    /// A tab became the active tab
    Activate,
    /// A tab was removed from the registry
    Close,
}

/// Payload delivered to subscribers
///
/// The snapshot is taken at emission time, after the transition it reports:
/// a `close` event already sees the decremented `open_tabs` count, and the
/// tab carried by an `activate` event is the active tab at that instant.
#[derive(Clone, Debug)]
pub struct TabEvent {
    pub kind: EventKind,
    /// Snapshot of the tab the event is about
    pub tab: TabInfo,
    /// Total number of open tabs across all windows at emission time
    pub open_tabs: usize,
}

/// Handle identifying one subscription, used for removal and scoped teardown
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&TabEvent) + Send + Sync + 'static>;

struct Listener {
    id: SubscriptionId,
    kind: EventKind,
    handler: Handler,
    once: bool,
    /// Cleared on revocation; checked immediately before each invocation so
    /// a revoked handler stays inert even if it was already snapshotted for
    /// an in-flight emission
    alive: Arc<AtomicBool>,
}

#[derive(Default)]
struct BusState {
    next_id: u64,
    listeners: Vec<Listener>,
}

/// Process-wide event bus for tab lifecycle events
///
/// Handlers for one event kind run synchronously, in registration order, to
/// completion. No internal lock is held while handlers run, so a handler may
/// read the registry, subscribe, and unsubscribe reentrantly.
#[derive(Clone, Default)]
pub struct EventBus {
    state: Arc<Mutex<BusState>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a persistent handler; fires on every occurrence of `kind`
    /// until removed
    pub fn on(
        &self,
        kind: EventKind,
        handler: impl Fn(&TabEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.register(kind, Arc::new(handler), false)
    }

    /// Register a one-shot handler; it is unregistered before it is invoked,
    /// so it observes exactly one occurrence
    pub fn once(
        &self,
        kind: EventKind,
        handler: impl Fn(&TabEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.register(kind, Arc::new(handler), true)
    }

    fn register(&self, kind: EventKind, handler: Handler, once: bool) -> SubscriptionId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = SubscriptionId(state.next_id);
        state.listeners.push(Listener {
            id,
            kind,
            handler,
            once,
            alive: Arc::new(AtomicBool::new(true)),
        });
        debug!(?id, ?kind, once, "registered listener");
        id
    }

    /// Unregister a handler; no-op if the id is unknown or already removed.
    ///
    /// Removal from within a handler does not affect handlers already
    /// snapshotted for the occurrence being dispatched.
    pub fn remove_listener(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.lock();
        if let Some(pos) = state.listeners.iter().position(|l| l.id == id) {
            state.listeners.remove(pos);
            debug!(?id, "removed listener");
            true
        } else {
            false
        }
    }

    /// Unregister a handler and make it permanently inert, including for any
    /// emission currently dispatching. Used by module unload.
    pub(crate) fn revoke(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.lock();
        if let Some(pos) = state.listeners.iter().position(|l| l.id == id) {
            let listener = state.listeners.remove(pos);
            listener.alive.store(false, Ordering::SeqCst);
            debug!(?id, "revoked listener");
            true
        } else {
            false
        }
    }

    /// Dispatch one occurrence to every matching handler in registration
    /// order. One-shot handlers are unregistered before any handler runs.
    pub(crate) fn emit(&self, event: &TabEvent) {
        let batch: Vec<(Handler, Arc<AtomicBool>)> = {
            let mut state = self.state.lock();
            let batch = state
                .listeners
                .iter()
                .filter(|l| l.kind == event.kind)
                .map(|l| (Arc::clone(&l.handler), Arc::clone(&l.alive)))
                .collect();
            state
                .listeners
                .retain(|l| !(l.kind == event.kind && l.once));
            batch
        };
        trace!(kind = ?event.kind, tab = %event.tab.id, handlers = batch.len(), "emitting");
        for (handler, alive) in batch {
            if alive.load(Ordering::SeqCst) {
                handler(event);
            }
        }
    }

    /// Number of live subscriptions, across all event kinds
    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }
}

#[cfg(test)]
#[path = "events_test.rs"]
mod events_test;
