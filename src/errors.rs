use thiserror::Error;

use crate::types::{TabId, WindowId};

/// Errors surfaced by registry, tab, and module operations
#[derive(Debug, Error)]
pub enum TabhubError {
    /// The tab was closed; the handle is no longer valid for operations
    #[error("tab {0} is closed")]
    TabClosed(TabId),
    /// The window was closed; the handle is no longer valid for operations
    #[error("window {0} is closed")]
    WindowClosed(WindowId),
    /// The module instance was unloaded; its API surface is permanently dead
    #[error("module instance has been unloaded")]
    ModuleUnloaded,
    /// The URL could not be parsed
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}
