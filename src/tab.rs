use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use crate::errors::TabhubError;
use crate::events::{EventKind, TabEvent};
use crate::navigation;
use crate::registry::{SessionInner, Window};
use crate::types::{TabId, TabInfo, TabState, Thumbnail};

/// Handle to one open tab.
///
/// Getters are synchronous snapshot reads; lifecycle operations are async
/// and serialize per tab, so two operations on the same tab never
/// interleave while operations on different tabs may. Every operation on a
/// closed tab fails with [`TabhubError::TabClosed`].
#[derive(Clone)]
pub struct Tab {
    id: TabId,
    inner: Arc<SessionInner>,
}

impl Tab {
    pub(crate) fn new(id: TabId, inner: Arc<SessionInner>) -> Self {
        Self { id, inner }
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        !self.inner.state.lock().tabs.contains_key(&self.id)
    }

    /// Full snapshot of the tab's current state
    pub fn info(&self) -> Result<TabInfo, TabhubError> {
        self.inner
            .state
            .lock()
            .snapshot(self.id)
            .ok_or(TabhubError::TabClosed(self.id))
    }

    pub fn url(&self) -> Result<String, TabhubError> {
        Ok(self.info()?.url)
    }

    pub fn title(&self) -> Result<String, TabhubError> {
        Ok(self.info()?.title)
    }

    /// Zero-based position within the owning window
    pub fn index(&self) -> Result<usize, TabhubError> {
        Ok(self.info()?.index)
    }

    /// Favicon URI; absent until the first navigation completes and for
    /// schemes without an origin
    pub fn favicon(&self) -> Result<Option<String>, TabhubError> {
        Ok(self.info()?.favicon)
    }

    /// Reserved field; reads as absent
    pub fn style(&self) -> Result<Option<String>, TabhubError> {
        Ok(self.info()?.style)
    }

    pub fn state(&self) -> Result<TabState, TabhubError> {
        Ok(self.info()?.state)
    }

    /// The window owning this tab
    pub fn window(&self) -> Result<Window, TabhubError> {
        let info = self.info()?;
        Ok(Window::new(info.window, Arc::clone(&self.inner)))
    }

    /// Whether this tab is the active tab of the active window
    pub fn is_active(&self) -> bool {
        self.inner.state.lock().active_tab_id() == Some(self.id)
    }

    fn op_lock(&self) -> Result<Arc<AsyncMutex<()>>, TabhubError> {
        self.inner
            .tab_locks
            .get(&self.id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(TabhubError::TabClosed(self.id))
    }

    /// Make this tab the active tab of its window and focus that window.
    /// Emits exactly one `activate` per effective transition; a no-op when
    /// the tab is already active.
    pub async fn activate(&self) -> Result<(), TabhubError> {
        let lock = self.op_lock()?;
        let _guard = lock.lock_owned().await;
        tokio::task::yield_now().await;
        self.activate_now()
    }

    /// Synchronous activation used both by `activate` and by foreground
    /// opens. State is updated before the event is emitted, so handlers
    /// reading the active tab see the new one.
    pub(crate) fn activate_now(&self) -> Result<(), TabhubError> {
        let event = {
            let mut state = self.inner.state.lock();
            let record = state
                .tabs
                .get(&self.id)
                .ok_or(TabhubError::TabClosed(self.id))?;
            let window_id = record.window;
            let already_active =
                state.active_window == Some(window_id) && state.active_tab_id() == Some(self.id);
            if already_active {
                return Ok(());
            }
            if let Some(window) = state.window_mut(window_id) {
                window.active_tab = Some(self.id);
            }
            state.active_window = Some(window_id);
            state.snapshot(self.id).map(|tab| TabEvent {
                kind: EventKind::Activate,
                open_tabs: state.order.len(),
                tab,
            })
        };
        if let Some(event) = event {
            debug!(tab = %self.id, "activated tab");
            self.inner.bus.emit(&event);
        }
        Ok(())
    }

    /// Navigate to a new URL. Emits one `ready` once the document loads.
    /// Never changes which tab is active.
    pub async fn set_url(&self, url: impl Into<String>) -> Result<(), TabhubError> {
        let url = url.into();
        navigation::validate(&url)?;
        self.navigate_locked(&url).await?;
        Ok(())
    }

    /// Re-navigate to the current URL, producing another `ready` with the
    /// URL unchanged
    pub async fn reload(&self) -> Result<(), TabhubError> {
        let lock = self.op_lock()?;
        let _guard = lock.lock_owned().await;
        let url = self.url()?;
        debug!(tab = %self.id, %url, "reloading");
        self.navigate(&url).await?;
        Ok(())
    }

    /// Navigation entry point for callers not already holding the op lock
    pub(crate) async fn navigate_locked(&self, url: &str) -> Result<TabInfo, TabhubError> {
        let lock = self.op_lock()?;
        let _guard = lock.lock_owned().await;
        self.navigate(url).await
    }

    /// Perform one navigation: mark loading, let the event loop run while
    /// the document "loads", then finalize url/title/favicon and emit
    /// `ready`. Caller must hold the per-tab op lock.
    async fn navigate(&self, url: &str) -> Result<TabInfo, TabhubError> {
        {
            let mut state = self.inner.state.lock();
            let record = state
                .tabs
                .get_mut(&self.id)
                .ok_or(TabhubError::TabClosed(self.id))?;
            record.state = TabState::Loading;
            record.url = url.to_string();
        }
        debug!(tab = %self.id, %url, "navigating");
        let delay = self.inner.config.nav_delay;
        if delay.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(delay).await;
        }
        let doc = navigation::load(url)?;
        let event = {
            let mut state = self.inner.state.lock();
            let record = state
                .tabs
                .get_mut(&self.id)
                // The tab can be closed out from under an in-flight load
                .ok_or(TabhubError::TabClosed(self.id))?;
            record.url = doc.url;
            record.title = doc.title;
            record.favicon = doc.favicon;
            record.state = TabState::Ready;
            let tab = state
                .snapshot(self.id)
                .ok_or(TabhubError::TabClosed(self.id))?;
            TabEvent {
                kind: EventKind::Ready,
                open_tabs: state.order.len(),
                tab,
            }
        };
        self.inner.bus.emit(&event);
        Ok(event.tab)
    }

    /// Close the tab. The returned future resolves only after the tab is
    /// gone from the registry and active-tab status is settled; the `close`
    /// event likewise observes the decremented count.
    pub async fn close(&self) -> Result<(), TabhubError> {
        let lock = self.op_lock()?;
        // Wait out any in-flight operation on this tab
        let guard = lock.lock_owned().await;
        let event = {
            let mut state = self.inner.state.lock();
            let tab = state.remove_tab(self.id)?;
            TabEvent {
                kind: EventKind::Close,
                open_tabs: state.order.len(),
                tab,
            }
        };
        drop(guard);
        self.inner.tab_locks.remove(&self.id);
        info!(tab = %self.id, "closed tab");
        self.inner.bus.emit(&event);
        Ok(())
    }

    /// Capture an opaque snapshot of the tab's current content
    pub async fn thumbnail(&self) -> Result<Thumbnail, TabhubError> {
        tokio::task::yield_now().await;
        let info = self.info()?;
        Ok(Thumbnail {
            tab: info.id,
            url: info.url,
            title: info.title,
            captured_at: Utc::now(),
        })
    }
}

#[cfg(test)]
#[path = "tab_test.rs"]
mod tab_test;
