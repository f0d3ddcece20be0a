//! Integration tests for the session lifecycle
//!
//! These tests drive a shared `SessionController` from several tasks against
//! the mock engine and network stack and verify:
//! - Concurrent stops release the session exactly once
//! - Engine calls never overlap while starts and stops race
//! - A stop during bring-up is honoured once the bring-up settles
//! - A start during bring-up replaces it
//! - Snapshots reach the presentation layer and stop after teardown

use std::sync::Arc;
use std::time::Duration;

use ladder_engine::mock::{MockEngine, MockNetworkStack, RecordingPresentation};
use ladder_engine::{spawn_renderer, Error, SessionController, SessionState};

const BOOTSTRAP: &str = "37 10.0.0.2 10.0.0.1 8.8.8.8 8.8.4.4";
const COUNTERS: &str = "1000 10 500 5 2000 20 800 4";

fn shared_controller() -> (Arc<MockEngine>, Arc<MockNetworkStack>, Arc<SessionController>) {
    let engine = Arc::new(MockEngine::new());
    engine.set_bootstrap(BOOTSTRAP);
    engine.set_counters(COUNTERS);
    let stack = Arc::new(MockNetworkStack::new());
    let controller = Arc::new(SessionController::new(engine.clone(), stack.clone()));
    (engine, stack, controller)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_stop_releases_once() {
    let (engine, stack, controller) = shared_controller();
    controller.start("2001:db8::1", 5678).await.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let controller = controller.clone();
            tokio::spawn(async move { controller.stop().await })
        })
        .collect();

    let mut released = 0;
    for handle in handles {
        if handle.await.unwrap() {
            released += 1;
        }
    }

    assert_eq!(released, 1);
    assert_eq!(controller.state(), SessionState::Idle);
    assert_eq!(engine.stop_count(), 1);
    assert_eq!(stack.close_count(), 1);
    assert_eq!(stack.open_interfaces(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_starts_and_stops_never_overlap_engine_calls() {
    let (engine, stack, controller) = shared_controller();

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let controller = controller.clone();
            tokio::spawn(async move {
                if i % 2 == 0 {
                    match controller.start("2001:db8::1", 5678).await {
                        Ok(()) | Err(Error::Busy(_)) | Err(Error::Cancelled) => {}
                        Err(e) => panic!("unexpected start error: {}", e),
                    }
                } else {
                    controller.stop().await;
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }
    controller.stop().await;

    assert_eq!(engine.overlapping_calls(), 0);
    assert_eq!(controller.state(), SessionState::Idle);
    assert_eq!(stack.open_interfaces(), 0);
    assert_eq!(stack.establish_count(), engine.start_count());
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_establishing_releases_session() {
    let (engine, stack, controller) = shared_controller();
    engine.set_open_delay(Duration::from_millis(100));

    let start = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.start("2001:db8::1", 5678).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(controller.state(), SessionState::Establishing);

    assert!(controller.stop().await);
    assert_eq!(controller.state(), SessionState::Idle);

    let result = start.await.unwrap();
    assert!(matches!(result, Err(Error::Cancelled)));
    assert_eq!(stack.establish_count(), 1);
    assert_eq!(stack.open_interfaces(), 0);
    assert_eq!(engine.stop_count(), 1);
    assert_eq!(engine.overlapping_calls(), 0);

    // Nothing keeps polling once the bring-up was abandoned
    let reads = engine.read_count();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(engine.read_count(), reads);
    assert!(controller.latest_snapshot().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_start_during_establishing_replaces_bring_up() {
    let (engine, stack, controller) = shared_controller();
    engine.set_open_delay(Duration::from_millis(100));

    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.start("2001:db8::1", 5678).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(controller.state(), SessionState::Establishing);

    controller.start("2001:db8::2", 5679).await.unwrap();
    assert!(matches!(first.await.unwrap(), Err(Error::Cancelled)));

    assert_eq!(controller.state(), SessionState::Active);
    assert_eq!(engine.opened_with(), Some(("2001:db8::2".to_string(), 5679)));
    assert_eq!(engine.open_count(), 2);
    assert_eq!(engine.stop_count(), 1);
    assert_eq!(stack.establish_count(), 2);
    assert_eq!(stack.open_interfaces(), 1);
    assert_eq!(engine.overlapping_calls(), 0);

    assert!(controller.stop().await);
    assert_eq!(stack.open_interfaces(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_snapshots_reach_presentation() {
    let (_engine, _stack, controller) = shared_controller();
    let presentation = Arc::new(RecordingPresentation::new());
    let renderer = spawn_renderer(presentation.clone(), controller.subscribe());

    controller.start("2001:db8::1", 5678).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;
    controller.stop().await;

    let rendered = presentation.rendered();
    assert!(!rendered.is_empty());
    let last = rendered.last().unwrap();
    assert!(last.contains("Total download: 1000 Bytes, 10 Packets"));
    assert!(last.contains("Download speed: 100.0 Bytes/s"));
    assert!(last.contains("Uploading speed: 200.0 Bytes/s"));

    let count = rendered.len();
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(presentation.rendered().len(), count);

    drop(controller);
    renderer.await.unwrap();
}

#[tokio::test]
async fn test_failed_start_leaves_nothing_allocated() {
    let (engine, stack, controller) = shared_controller();
    stack.set_deny_establish(true);

    assert!(controller.start("2001:db8::1", 5678).await.is_err());
    assert_eq!(controller.state(), SessionState::Idle);
    assert_eq!(stack.open_interfaces(), 0);
    assert_eq!(engine.start_count(), 0);
    assert!(controller.latest_snapshot().is_none());

    stack.set_deny_establish(false);
    controller.start("2001:db8::1", 5678).await.unwrap();
    assert_eq!(stack.open_interfaces(), 1);
    assert!(controller.stop().await);
    assert_eq!(stack.open_interfaces(), 0);
}
