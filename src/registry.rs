use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use crate::errors::TabhubError;
use crate::events::{EventBus, EventKind, SubscriptionId, TabEvent};
use crate::loader::TabsModule;
use crate::navigation::{self, LoadedDocument};
use crate::tab::Tab;
use crate::types::{OpenOptions, SessionConfig, TabId, TabInfo, TabState, WindowId, WindowOptions};

pub(crate) struct TabRecord {
    pub(crate) window: WindowId,
    pub(crate) url: String,
    pub(crate) title: String,
    pub(crate) favicon: Option<String>,
    pub(crate) state: TabState,
    pub(crate) style: Option<String>,
    pub(crate) opened_at: DateTime<Utc>,
}

pub(crate) struct WindowState {
    pub(crate) id: WindowId,
    /// Tab order within the window
    pub(crate) tabs: Vec<TabId>,
    /// Set whenever the window holds at least one tab
    pub(crate) active_tab: Option<TabId>,
}

/// All mutable session state, guarded by one synchronous lock.
///
/// The lock is never held across an await point and never held while event
/// handlers run, so handlers may read back through the public handles.
#[derive(Default)]
pub(crate) struct SessionState {
    pub(crate) windows: Vec<WindowState>,
    /// Aggregate tab order: insertion order across all windows
    pub(crate) order: Vec<TabId>,
    pub(crate) tabs: HashMap<TabId, TabRecord>,
    pub(crate) active_window: Option<WindowId>,
    next_tab: u64,
    next_window: u64,
}

impl SessionState {
    pub(crate) fn window(&self, id: WindowId) -> Option<&WindowState> {
        self.windows.iter().find(|w| w.id == id)
    }

    pub(crate) fn window_mut(&mut self, id: WindowId) -> Option<&mut WindowState> {
        self.windows.iter_mut().find(|w| w.id == id)
    }

    pub(crate) fn snapshot(&self, id: TabId) -> Option<TabInfo> {
        let record = self.tabs.get(&id)?;
        let window = self.window(record.window)?;
        let index = window.tabs.iter().position(|t| *t == id)?;
        Some(TabInfo {
            id,
            window: record.window,
            url: record.url.clone(),
            title: record.title.clone(),
            index,
            favicon: record.favicon.clone(),
            state: record.state,
            style: record.style.clone(),
            opened_at: record.opened_at,
        })
    }

    pub(crate) fn active_tab_id(&self) -> Option<TabId> {
        let window = self.window(self.active_window?)?;
        window.active_tab
    }

    pub(crate) fn insert_window(&mut self) -> WindowId {
        self.next_window += 1;
        let id = WindowId(self.next_window);
        self.windows.push(WindowState {
            id,
            tabs: Vec::new(),
            active_tab: None,
        });
        id
    }

    /// Append a tab to a window and return its snapshot. The first tab of a
    /// window becomes that window's active tab.
    pub(crate) fn insert_tab(&mut self, window: WindowId, url: &str) -> TabInfo {
        self.next_tab += 1;
        let id = TabId(self.next_tab);
        let opened_at = Utc::now();
        let mut index = 0;
        if let Some(state) = self.window_mut(window) {
            index = state.tabs.len();
            state.tabs.push(id);
            if state.active_tab.is_none() {
                state.active_tab = Some(id);
            }
        }
        self.order.push(id);
        self.tabs.insert(
            id,
            TabRecord {
                window,
                url: url.to_string(),
                title: String::new(),
                favicon: None,
                state: TabState::Loading,
                style: None,
                opened_at,
            },
        );
        TabInfo {
            id,
            window,
            url: url.to_string(),
            title: String::new(),
            index,
            favicon: None,
            state: TabState::Loading,
            style: None,
            opened_at,
        }
    }

    /// Remove a tab, settling active-tab and active-window status before
    /// returning. The snapshot reports the pre-removal index with state
    /// `Closed`. A window losing its last tab is removed with it.
    pub(crate) fn remove_tab(&mut self, id: TabId) -> Result<TabInfo, TabhubError> {
        let Some(record) = self.tabs.remove(&id) else {
            return Err(TabhubError::TabClosed(id));
        };
        let window_id = record.window;
        let mut info = TabInfo {
            id,
            window: window_id,
            url: record.url,
            title: record.title,
            index: 0,
            favicon: record.favicon,
            state: TabState::Closed,
            style: record.style,
            opened_at: record.opened_at,
        };
        self.order.retain(|t| *t != id);
        if let Some(pos) = self.windows.iter().position(|w| w.id == window_id) {
            let window = &mut self.windows[pos];
            if let Some(tab_pos) = window.tabs.iter().position(|t| *t == id) {
                info.index = tab_pos;
                window.tabs.remove(tab_pos);
                if window.active_tab == Some(id) {
                    // Successor at the same position, else the new last tab
                    window.active_tab = window.tabs.get(tab_pos).or_else(|| window.tabs.last()).copied();
                }
            }
            if window.tabs.is_empty() {
                self.windows.remove(pos);
                if self.active_window == Some(window_id) {
                    self.active_window = self.windows.last().map(|w| w.id);
                }
            }
        }
        Ok(info)
    }
}

pub(crate) struct SessionInner {
    pub(crate) state: Mutex<SessionState>,
    pub(crate) bus: EventBus,
    /// Per-tab locks for operation serialization (lock-free concurrent access)
    pub(crate) tab_locks: DashMap<TabId, Arc<AsyncMutex<()>>>,
    pub(crate) config: SessionConfig,
}

/// Process-wide aggregate of all open tabs across all windows.
///
/// Cloning yields another handle to the same session. The registry is the
/// injected service everything else hangs off: tabs, windows, the event
/// bus, and module instances all reach the session through it.
#[derive(Clone)]
pub struct Registry {
    inner: Arc<SessionInner>,
}

impl Registry {
    /// Create a session with one window holding one already-loaded tab at
    /// `config.start_url`. No events fire for this bootstrap state.
    pub fn new(config: SessionConfig) -> Self {
        let mut state = SessionState::default();
        let window_id = state.insert_window();
        let bootstrap = state.insert_tab(window_id, &config.start_url);
        state.active_window = Some(window_id);
        let doc = navigation::load(&config.start_url).unwrap_or_else(|_| LoadedDocument {
            url: config.start_url.clone(),
            title: config.start_url.clone(),
            favicon: None,
        });
        if let Some(record) = state.tabs.get_mut(&bootstrap.id) {
            record.title = doc.title;
            record.favicon = doc.favicon;
            record.state = TabState::Ready;
        }
        let inner = Arc::new(SessionInner {
            state: Mutex::new(state),
            bus: EventBus::new(),
            tab_locks: DashMap::new(),
            config,
        });
        inner
            .tab_locks
            .insert(bootstrap.id, Arc::new(AsyncMutex::new(())));
        info!(start_url = %inner.config.start_url, "session initialized");
        Self { inner }
    }

    pub fn with_defaults() -> Self {
        Self::new(SessionConfig::default())
    }

    /// Total number of open tabs across all windows
    pub fn len(&self) -> usize {
        self.inner.state.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All open tabs, in insertion order across windows
    pub fn tabs(&self) -> Vec<Tab> {
        let state = self.inner.state.lock();
        state
            .order
            .iter()
            .map(|id| Tab::new(*id, Arc::clone(&self.inner)))
            .collect()
    }

    /// Look up an open tab by id
    pub fn tab(&self, id: TabId) -> Option<Tab> {
        let state = self.inner.state.lock();
        state
            .tabs
            .contains_key(&id)
            .then(|| Tab::new(id, Arc::clone(&self.inner)))
    }

    /// All open windows, in insertion order
    pub fn windows(&self) -> Vec<Window> {
        let state = self.inner.state.lock();
        state
            .windows
            .iter()
            .map(|w| Window::new(w.id, Arc::clone(&self.inner)))
            .collect()
    }

    /// Look up an open window by id
    pub fn window(&self, id: WindowId) -> Option<Window> {
        let state = self.inner.state.lock();
        state
            .window(id)
            .map(|w| Window::new(w.id, Arc::clone(&self.inner)))
    }

    /// The currently focused window, if any window is open
    pub fn active_window(&self) -> Option<Window> {
        let state = self.inner.state.lock();
        state
            .active_window
            .map(|id| Window::new(id, Arc::clone(&self.inner)))
    }

    /// The active tab of the active window
    pub fn active_tab(&self) -> Option<Tab> {
        let state = self.inner.state.lock();
        state
            .active_tab_id()
            .map(|id| Tab::new(id, Arc::clone(&self.inner)))
    }

    /// Open a tab in the active window.
    ///
    /// Accepts a bare URL or full [`OpenOptions`]. Emits `open`, activates
    /// the tab unless `in_background`, then performs the initial navigation
    /// and emits `ready`. The returned future resolves after `ready`.
    pub async fn open(&self, options: impl Into<OpenOptions>) -> Result<Tab, TabhubError> {
        self.open_in(None, options.into()).await
    }

    pub(crate) async fn open_in(
        &self,
        window: Option<WindowId>,
        options: OpenOptions,
    ) -> Result<Tab, TabhubError> {
        let OpenOptions {
            url,
            in_background,
            on_open,
            on_ready,
        } = options;
        navigation::validate(&url)?;
        let (tab, open_event) = self.insert(window, &url)?;
        info!(tab = %tab.id(), %url, in_background, "opening tab");
        self.inner.bus.emit(&open_event);
        if let Some(callback) = on_open {
            callback(&open_event.tab);
        }
        if !in_background {
            tab.activate_now()?;
        }
        let ready = tab.navigate_locked(&url).await?;
        if let Some(callback) = on_ready {
            callback(&ready);
        }
        Ok(tab)
    }

    /// Insert the tab record and build the `open` event. The event already
    /// reflects the incremented registry length.
    fn insert(&self, window: Option<WindowId>, url: &str) -> Result<(Tab, TabEvent), TabhubError> {
        let event = {
            let mut state = self.inner.state.lock();
            let target = match window {
                Some(id) => {
                    state.window(id).ok_or(TabhubError::WindowClosed(id))?;
                    id
                }
                None => match state.active_window {
                    Some(id) => id,
                    // Every window was closed; give the tab a fresh one
                    None => {
                        let id = state.insert_window();
                        state.active_window = Some(id);
                        id
                    }
                },
            };
            let info = state.insert_tab(target, url);
            TabEvent {
                kind: EventKind::Open,
                open_tabs: state.order.len(),
                tab: info,
            }
        };
        self.inner
            .tab_locks
            .insert(event.tab.id, Arc::new(AsyncMutex::new(())));
        Ok((Tab::new(event.tab.id, Arc::clone(&self.inner)), event))
    }

    /// Open a new window with one tab at `options.url` (defaulting to the
    /// session start URL). The window takes focus unless `in_background`.
    pub async fn open_window(&self, options: WindowOptions) -> Result<Window, TabhubError> {
        let url = options
            .url
            .unwrap_or_else(|| self.inner.config.start_url.clone());
        navigation::validate(&url)?;
        let (window, tab, open_event) = {
            let mut state = self.inner.state.lock();
            let window_id = state.insert_window();
            let info = state.insert_tab(window_id, &url);
            let event = TabEvent {
                kind: EventKind::Open,
                open_tabs: state.order.len(),
                tab: info,
            };
            (
                Window::new(window_id, Arc::clone(&self.inner)),
                Tab::new(event.tab.id, Arc::clone(&self.inner)),
                event,
            )
        };
        self.inner
            .tab_locks
            .insert(tab.id(), Arc::new(AsyncMutex::new(())));
        info!(window = %window.id(), %url, "opening window");
        self.inner.bus.emit(&open_event);
        if !options.in_background {
            tab.activate_now()?;
        }
        tab.navigate_locked(&url).await?;
        Ok(window)
    }

    /// Register a persistent registry-level handler. These outlive any
    /// module instance's `unload`.
    pub fn on(
        &self,
        kind: EventKind,
        handler: impl Fn(&TabEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.inner.bus.on(kind, handler)
    }

    /// Register a one-shot registry-level handler
    pub fn once(
        &self,
        kind: EventKind,
        handler: impl Fn(&TabEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.inner.bus.once(kind, handler)
    }

    /// Unregister a handler; no-op if already removed
    pub fn remove_listener(&self, id: SubscriptionId) -> bool {
        self.inner.bus.remove_listener(id)
    }

    /// Create an isolated module instance whose subscriptions can be revoked
    /// in bulk with [`TabsModule::unload`]
    pub fn module(&self) -> TabsModule {
        TabsModule::new(self.clone())
    }

    pub(crate) fn bus(&self) -> &EventBus {
        &self.inner.bus
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Handle to one open window
#[derive(Clone)]
pub struct Window {
    id: WindowId,
    inner: Arc<SessionInner>,
}

impl Window {
    pub(crate) fn new(id: WindowId, inner: Arc<SessionInner>) -> Self {
        Self { id, inner }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().window(self.id).is_none()
    }

    /// Whether this is the focused window
    pub fn is_active(&self) -> bool {
        self.inner.state.lock().active_window == Some(self.id)
    }

    pub fn tab_count(&self) -> Result<usize, TabhubError> {
        let state = self.inner.state.lock();
        let window = state
            .window(self.id)
            .ok_or(TabhubError::WindowClosed(self.id))?;
        Ok(window.tabs.len())
    }

    /// The window's tabs in order
    pub fn tabs(&self) -> Result<Vec<Tab>, TabhubError> {
        let state = self.inner.state.lock();
        let window = state
            .window(self.id)
            .ok_or(TabhubError::WindowClosed(self.id))?;
        Ok(window
            .tabs
            .iter()
            .map(|id| Tab::new(*id, Arc::clone(&self.inner)))
            .collect())
    }

    /// The window's active tab. An open window always has one: a window
    /// never outlives its last tab.
    pub fn active_tab(&self) -> Result<Tab, TabhubError> {
        let state = self.inner.state.lock();
        let window = state
            .window(self.id)
            .ok_or(TabhubError::WindowClosed(self.id))?;
        let id = window
            .active_tab
            .ok_or(TabhubError::WindowClosed(self.id))?;
        Ok(Tab::new(id, Arc::clone(&self.inner)))
    }

    /// Open a tab inside this window
    pub async fn open(&self, options: impl Into<OpenOptions>) -> Result<Tab, TabhubError> {
        let registry = Registry {
            inner: Arc::clone(&self.inner),
        };
        registry.open_in(Some(self.id), options.into()).await
    }

    /// Close every tab in the window, emitting a `close` per tab. The
    /// window itself is removed when its last tab goes.
    pub async fn close(&self) -> Result<(), TabhubError> {
        let tabs = self.tabs()?;
        info!(window = %self.id, tabs = tabs.len(), "closing window");
        for tab in tabs {
            match tab.close().await {
                Ok(()) => {}
                // Raced with an individual close; the goal state is reached
                Err(TabhubError::TabClosed(id)) => {
                    debug!(tab = %id, "tab already closed during window close");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod registry_test;
