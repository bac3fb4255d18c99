use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a tab, unique within a session
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub(crate) u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

/// Identifier of a window, unique within a session
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WindowId(pub(crate) u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window-{}", self.0)
    }
}

/// Load state of a tab
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TabState {
    /// A navigation is in flight; title and favicon are not final
    Loading,
    /// The document finished loading
    Ready,
    /// The tab was removed from the registry
    Closed,
}

/// Point-in-time snapshot of a tab, carried by lifecycle events
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TabInfo {
    /// Tab identifier
    pub id: TabId,
    /// Owning window
    pub window: WindowId,
    /// Current URL (the caller-supplied string, not a normalized form)
    pub url: String,
    /// Document title, derived from the loaded document
    pub title: String,
    /// Zero-based position within the owning window
    pub index: usize,
    /// Favicon URI, populated once the document has loaded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    /// Load state at snapshot time
    pub state: TabState,
    /// Reserved field; always absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// When the tab was opened
    pub opened_at: DateTime<Utc>,
}

/// Opaque snapshot of a tab's rendered content, captured on demand
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Thumbnail {
    /// Tab the snapshot was taken from
    pub tab: TabId,
    /// URL at capture time
    pub url: String,
    /// Title at capture time
    pub title: String,
    /// Capture timestamp
    pub captured_at: DateTime<Utc>,
}

/// Completion callback carried by [`OpenOptions`]
pub type OpenCallback = Box<dyn FnOnce(&TabInfo) + Send + 'static>;

/// Options for opening a tab
///
/// A bare URL string converts into options with defaults, so `open` accepts
/// either form:
///
/// ```no_run
/// # async fn example(registry: tabhub::Registry) -> Result<(), tabhub::TabhubError> {
/// registry.open("https://example.com").await?;
/// registry.open(
///     tabhub::OpenOptions::new("https://example.com").in_background(true),
/// ).await?;
/// # Ok(())
/// # }
/// ```
pub struct OpenOptions {
    pub(crate) url: String,
    pub(crate) in_background: bool,
    pub(crate) on_open: Option<OpenCallback>,
    pub(crate) on_ready: Option<OpenCallback>,
}

impl OpenOptions {
    /// Start building options for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            in_background: false,
            on_open: None,
            on_ready: None,
        }
    }

    /// Suppress activation of the new tab (defaults to false)
    pub fn in_background(mut self, in_background: bool) -> Self {
        self.in_background = in_background;
        self
    }

    /// Callback invoked after the tab exists in the registry
    pub fn on_open(mut self, callback: impl FnOnce(&TabInfo) + Send + 'static) -> Self {
        self.on_open = Some(Box::new(callback));
        self
    }

    /// Callback invoked after the initial navigation completes
    pub fn on_ready(mut self, callback: impl FnOnce(&TabInfo) + Send + 'static) -> Self {
        self.on_ready = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for OpenOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenOptions")
            .field("url", &self.url)
            .field("in_background", &self.in_background)
            .field("on_open", &self.on_open.is_some())
            .field("on_ready", &self.on_ready.is_some())
            .finish()
    }
}

impl From<&str> for OpenOptions {
    fn from(url: &str) -> Self {
        Self::new(url)
    }
}

impl From<String> for OpenOptions {
    fn from(url: String) -> Self {
        Self::new(url)
    }
}

/// Options for opening a window
#[derive(Clone, Debug, Default)]
pub struct WindowOptions {
    pub(crate) url: Option<String>,
    pub(crate) in_background: bool,
}

impl WindowOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// URL for the window's initial tab (defaults to the session start URL)
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Keep the current window active instead of focusing the new one
    pub fn in_background(mut self, in_background: bool) -> Self {
        self.in_background = in_background;
        self
    }
}

/// Session-wide configuration, injected at registry construction
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// URL of the bootstrap tab and the default for new windows
    pub start_url: String,
    /// Simulated document load time; zero still yields to the event loop once
    pub nav_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_url: "about:blank".to_string(),
            nav_delay: Duration::ZERO,
        }
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
