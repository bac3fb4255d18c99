// Integration tests for operation serialization: operations on one tab
// take turns through its lock, operations on different tabs overlap. A
// non-zero nav_delay keeps navigations in flight long enough to contend.

mod common;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tabhub::{EventKind, OpenOptions, Registry, SessionConfig, TabState};

const PAGE: &str = "data:text/html;charset=utf-8,default";

fn slow_registry() -> Registry {
    Registry::new(SessionConfig {
        nav_delay: Duration::from_millis(25),
        ..SessionConfig::default()
    })
}

#[tokio::test]
async fn test_close_waits_for_inflight_navigation() {
    common::init_tracing();
    let registry = slow_registry();
    let tab = registry.open(PAGE).await.unwrap();

    let log = Arc::new(Mutex::new(Vec::new()));
    for kind in [EventKind::Ready, EventKind::Close] {
        let log = Arc::clone(&log);
        registry.on(kind, move |event| log.lock().push(event.kind));
    }

    let target = "data:text/html;charset=utf-8,<title>slow</title>";
    let nav_tab = tab.clone();
    let nav = tokio::spawn(async move { nav_tab.set_url(target).await });

    // Let the navigation take the tab's lock and park in its load delay
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(tab.state().unwrap(), TabState::Loading);
    assert_eq!(tab.url().unwrap(), target);

    // Close must wait the navigation out, not tear the tab from under it
    tab.close().await.unwrap();

    nav.await.unwrap().unwrap();
    assert!(tab.is_closed());
    assert_eq!(*log.lock(), vec![EventKind::Ready, EventKind::Close]);
}

#[tokio::test]
async fn test_same_tab_navigations_take_turns() {
    common::init_tracing();
    let registry = slow_registry();
    let tab = registry.open(PAGE).await.unwrap();

    let ready = Arc::new(Mutex::new(Vec::new()));
    let ready_clone = Arc::clone(&ready);
    registry.on(EventKind::Ready, move |event| {
        ready_clone
            .lock()
            .push((event.tab.url.clone(), event.tab.state));
    });

    let first = "data:text/html;charset=utf-8,<title>first</title>";
    let second = "data:text/html;charset=utf-8,<title>second</title>";
    let tab_a = tab.clone();
    let tab_b = tab.clone();
    let a = tokio::spawn(async move { tab_a.set_url(first).await });
    let b = tokio::spawn(async move { tab_b.set_url(second).await });
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    // Two whole navigations, each emitting one ready with its own settled
    // document, and the tab ends at whichever document loaded last
    let ready = ready.lock();
    assert_eq!(ready.len(), 2);
    let urls: Vec<&str> = ready.iter().map(|(url, _)| url.as_str()).collect();
    assert!(urls.contains(&first));
    assert!(urls.contains(&second));
    for (_, state) in ready.iter() {
        assert_eq!(*state, TabState::Ready);
    }
    assert_eq!(tab.url().unwrap(), ready.last().unwrap().0);
}

#[tokio::test]
async fn test_reload_during_navigation_serializes() {
    common::init_tracing();
    let registry = slow_registry();
    let tab = registry.open(PAGE).await.unwrap();

    let ready_urls = Arc::new(Mutex::new(Vec::new()));
    let ready_clone = Arc::clone(&ready_urls);
    registry.on(EventKind::Ready, move |event| {
        ready_clone.lock().push(event.tab.url.clone());
    });

    let target = "data:text/html;charset=utf-8,<title>landing</title>";
    let nav_tab = tab.clone();
    let nav = tokio::spawn(async move { nav_tab.set_url(target).await });
    tokio::time::sleep(Duration::from_millis(5)).await;

    // The reload queues behind the in-flight navigation and reloads the
    // document that navigation lands on
    tab.reload().await.unwrap();

    nav.await.unwrap().unwrap();
    assert_eq!(
        *ready_urls.lock(),
        vec![target.to_string(), target.to_string()]
    );
    assert_eq!(tab.title().unwrap(), "landing");
}

#[tokio::test]
async fn test_different_tabs_load_concurrently() {
    common::init_tracing();
    let registry = slow_registry();
    let first = registry.open(PAGE).await.unwrap();
    let second = registry
        .open(OpenOptions::new(PAGE).in_background(true))
        .await
        .unwrap();

    let first_clone = first.clone();
    let second_clone = second.clone();
    let a = tokio::spawn(async move { first_clone.reload().await });
    let b = tokio::spawn(async move { second_clone.reload().await });

    // Both loads are in flight at once; neither waits on the other's lock
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert_eq!(first.state().unwrap(), TabState::Loading);
    assert_eq!(second.state().unwrap(), TabState::Loading);

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();
    assert_eq!(first.state().unwrap(), TabState::Ready);
    assert_eq!(second.state().unwrap(), TabState::Ready);
}
