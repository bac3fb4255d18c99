#[cfg(test)]
mod tests {
    use super::super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex as SyncMutex;
    use pretty_assertions::assert_eq;

    use crate::errors::TabhubError;
    use crate::events::EventKind;
    use crate::registry::Registry;
    use crate::types::{OpenOptions, TabState, WindowOptions};

    #[tokio::test]
    async fn test_set_url_navigates_and_fires_one_ready() {
        let registry = Registry::with_defaults();
        let tab = registry.open("data:text/html,first").await.unwrap();

        let ready = Arc::new(SyncMutex::new(Vec::new()));
        let ready_clone = Arc::clone(&ready);
        registry.on(EventKind::Ready, move |event| {
            ready_clone.lock().push(event.tab.url.clone());
        });

        let target = "data:text/html,<title>second</title>";
        tab.set_url(target).await.unwrap();

        assert_eq!(*ready.lock(), vec![target.to_string()]);
        assert_eq!(tab.url().unwrap(), target);
        assert_eq!(tab.title().unwrap(), "second");
    }

    #[tokio::test]
    async fn test_set_url_keeps_active_tab_identity() {
        let registry = Registry::with_defaults();
        let background = registry
            .open(OpenOptions::new("data:text/html,bg").in_background(true))
            .await
            .unwrap();
        let active_before = registry.active_tab().map(|t| t.id());

        background.set_url("data:text/html,elsewhere").await.unwrap();
        assert_eq!(registry.active_tab().map(|t| t.id()), active_before);
    }

    #[tokio::test]
    async fn test_set_url_rejects_invalid() {
        let registry = Registry::with_defaults();
        let tab = registry.open("data:text/html,ok").await.unwrap();
        let before = tab.url().unwrap();

        assert!(matches!(
            tab.set_url("no scheme here").await,
            Err(TabhubError::InvalidUrl { .. })
        ));
        assert_eq!(tab.url().unwrap(), before);
    }

    #[tokio::test]
    async fn test_reload_fires_second_ready_with_same_url() {
        let registry = Registry::with_defaults();
        let url = "data:text/html,<title>stay</title>";
        let tab = registry.open(url).await.unwrap();

        let ready = Arc::new(SyncMutex::new(Vec::new()));
        let ready_clone = Arc::clone(&ready);
        registry.on(EventKind::Ready, move |event| {
            ready_clone.lock().push(event.tab.url.clone());
        });

        tab.reload().await.unwrap();

        assert_eq!(*ready.lock(), vec![url.to_string()]);
        assert_eq!(tab.url().unwrap(), url);
        assert_eq!(tab.title().unwrap(), "stay");
    }

    #[tokio::test]
    async fn test_activate_fires_once_with_settled_state() {
        let registry = Registry::with_defaults();
        let tab = registry
            .open(OpenOptions::new("data:text/html,bg").in_background(true))
            .await
            .unwrap();

        let observed = Arc::new(SyncMutex::new(Vec::new()));
        let observed_clone = Arc::clone(&observed);
        let reader = registry.clone();
        registry.on(EventKind::Activate, move |event| {
            // No stale reads: the registry already reports the emitted tab
            let active = reader.active_tab().map(|t| t.id());
            observed_clone.lock().push((event.tab.id, active));
        });

        tab.activate().await.unwrap();

        let observed = observed.lock();
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0], (tab.id(), Some(tab.id())));
        assert!(tab.is_active());
    }

    #[tokio::test]
    async fn test_activate_already_active_is_silent() {
        let registry = Registry::with_defaults();
        let tab = registry.open("data:text/html,fg").await.unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        registry.on(EventKind::Activate, move |_| {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        });

        tab.activate().await.unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_activate_background_window_tab() {
        let registry = Registry::with_defaults();
        let window = registry
            .open_window(WindowOptions::new().url("data:text/html,w2").in_background(true))
            .await
            .unwrap();
        let tab = window.active_tab().unwrap();
        assert!(!tab.is_active());

        tab.activate().await.unwrap();
        assert!(tab.is_active());
        assert!(window.is_active());
    }

    #[tokio::test]
    async fn test_close_invalidates_handle() {
        let registry = Registry::with_defaults();
        let tab = registry.open("data:text/html,x").await.unwrap();
        tab.close().await.unwrap();

        assert!(tab.is_closed());
        assert!(matches!(tab.close().await, Err(TabhubError::TabClosed(_))));
        assert!(matches!(tab.url(), Err(TabhubError::TabClosed(_))));
        assert!(matches!(tab.reload().await, Err(TabhubError::TabClosed(_))));
        assert!(matches!(
            tab.activate().await,
            Err(TabhubError::TabClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_close_event_sees_decremented_count() {
        let registry = Registry::with_defaults();
        let tab = registry.open("data:text/html,x").await.unwrap();
        assert_eq!(registry.len(), 2);

        let seen = Arc::new(SyncMutex::new(None));
        let seen_clone = Arc::clone(&seen);
        let reader = registry.clone();
        registry.once(EventKind::Close, move |event| {
            *seen_clone.lock() = Some((event.open_tabs, reader.len(), event.tab.state));
        });

        tab.close().await.unwrap();
        assert_eq!(*seen.lock(), Some((1, 1, TabState::Closed)));
    }

    #[tokio::test]
    async fn test_style_reads_as_absent() {
        let registry = Registry::with_defaults();
        let tab = registry.open("data:text/html,x").await.unwrap();
        assert_eq!(tab.style().unwrap(), None);
    }

    #[tokio::test]
    async fn test_favicon_by_scheme() {
        let registry = Registry::with_defaults();
        let data_tab = registry.open("data:text/html,x").await.unwrap();
        assert_eq!(data_tab.favicon().unwrap(), None);

        let http_tab = registry.open("https://example.com/").await.unwrap();
        assert_eq!(
            http_tab.favicon().unwrap().as_deref(),
            Some("https://example.com/favicon.ico")
        );
    }

    #[tokio::test]
    async fn test_thumbnail_captures_current_content() {
        let registry = Registry::with_defaults();
        let tab = registry
            .open("data:text/html,<title>snap</title>")
            .await
            .unwrap();

        let thumbnail = tab.thumbnail().await.unwrap();
        assert_eq!(thumbnail.tab, tab.id());
        assert_eq!(thumbnail.url, tab.url().unwrap());
        assert_eq!(thumbnail.title, "snap");
    }

    #[tokio::test]
    async fn test_window_accessor() {
        let registry = Registry::with_defaults();
        let tab = registry.open("data:text/html,x").await.unwrap();
        let window = tab.window().unwrap();
        assert!(window.tabs().unwrap().iter().any(|t| t.id() == tab.id()));
    }
}
