//! # tabhub
#![allow(clippy::uninlined_format_args)]
//!
//! In-process model of browser tab and window lifecycles with observable
//! events.
//!
//! tabhub keeps an ordered registry of windows and tabs, tracks which tab is
//! active per window, and drives asynchronous lifecycle operations (open,
//! navigate, reload, activate, close) that complete through returned
//! futures, optional callbacks, and a process-wide event bus. Navigation is
//! simulated: documents are derived from the URL itself (`data:` URLs carry
//! their markup inline), so the whole lifecycle runs deterministically
//! without a browser. That makes it useful both as a stand-in for a real
//! tab manager in tests and as a reference model of the event ordering one
//! guarantees.
//!
//! ## Ordering guarantees
//!
//! Events for a given tab fire in causal order: `open` precedes `ready`,
//! `ready` precedes later `activate`/`ready`, and `close` comes last. State
//! is settled before emission: an `activate` handler reading
//! [`Registry::active_tab`] sees the tab the event carries, and a `close`
//! handler already sees the decremented registry length.
//!
//! ## Usage
//!
//! ```
//! use tabhub::{EventKind, Registry};
//!
//! # async fn example() -> Result<(), tabhub::TabhubError> {
//! let registry = Registry::with_defaults();
//!
//! registry.on(EventKind::Ready, |event| {
//!     println!("{} finished loading {}", event.tab.id, event.tab.url);
//! });
//!
//! let tab = registry.open("data:text/html,<title>hello</title>").await?;
//! assert_eq!(tab.title()?, "hello");
//! assert!(tab.is_active());
//!
//! tab.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Background tabs and options
//!
//! ```
//! use tabhub::{OpenOptions, Registry};
//!
//! # async fn example() -> Result<(), tabhub::TabhubError> {
//! let registry = Registry::with_defaults();
//! let active_before = registry.active_tab().map(|t| t.id());
//!
//! let tab = registry
//!     .open(OpenOptions::new("data:text/html,quiet").in_background(true))
//!     .await?;
//!
//! // A background open never steals focus
//! assert_eq!(registry.active_tab().map(|t| t.id()), active_before);
//! # let _ = tab;
//! # Ok(())
//! # }
//! ```
//!
//! ## Scoped subscriptions
//!
//! Module instances created with [`Registry::module`] own their
//! subscriptions; [`TabsModule::unload`] revokes them in bulk without
//! touching handlers registered elsewhere.

/// Lifecycle events and the subscription machinery
pub mod events;

/// Module instances with bulk-revocable subscriptions
pub mod loader;

/// Tab registry, windows, and session state
pub mod registry;

/// Tab handles and per-tab lifecycle operations
pub mod tab;

/// Identifiers, snapshots, and option structs
pub mod types;

mod errors;
mod navigation;

pub use errors::TabhubError;
pub use events::{EventBus, EventKind, SubscriptionId, TabEvent};
pub use loader::TabsModule;
pub use registry::{Registry, Window};
pub use tab::Tab;
pub use types::{
    OpenCallback, OpenOptions, SessionConfig, TabId, TabInfo, TabState, Thumbnail, WindowId,
    WindowOptions,
};
