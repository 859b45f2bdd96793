//! Startup ordering and shutdown coordination.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use graphql_gateway::http::TypenameExecutor;
use graphql_gateway::{DrainOutcome, LifecycleCoordinator, LifecycleState, ServiceState, StartError};
use tokio::time::Instant;

mod common;
use common::{CloseBehavior, EventLog, FakeListener, FakeStore};

fn coordinator(store: FakeStore, listener: FakeListener) -> LifecycleCoordinator<FakeStore, FakeListener> {
    LifecycleCoordinator::new(store, listener, LifecycleState::new(), 4000)
}

#[tokio::test]
async fn start_runs_steps_in_order() {
    let log = EventLog::default();
    let c = coordinator(FakeStore::new(log.clone()), FakeListener::new(log.clone()));

    c.start().await.unwrap();

    assert_eq!(
        log.events(),
        vec!["store.connect", "store.ensure_indexes", "listener.start"]
    );
    assert_eq!(c.state(), ServiceState::Running);
    assert_eq!(c.bound_port().await, Some(4000));
}

#[tokio::test]
async fn connect_failure_stops_boot() {
    let log = EventLog::default();
    let mut store = FakeStore::new(log.clone());
    store.fail_connect = true;
    let c = coordinator(store, FakeListener::new(log.clone()));

    let err = c.start().await.unwrap_err();

    assert!(matches!(err, StartError::StoreConnect(_)));
    assert_eq!(log.events(), vec!["store.connect"]);
    assert_eq!(c.state(), ServiceState::NotStarted);
}

#[tokio::test]
async fn prepare_failure_releases_store_and_skips_listener() {
    let log = EventLog::default();
    let mut store = FakeStore::new(log.clone());
    store.fail_prepare = true;
    let open = store.open_handles.clone();
    let listener = FakeListener::new(log.clone());
    let starts = listener.starts.clone();
    let c = coordinator(store, listener);

    let err = c.start().await.unwrap_err();

    assert!(matches!(err, StartError::StorePrepare(_)));
    assert_eq!(
        log.events(),
        vec!["store.connect", "store.ensure_indexes", "store.close"]
    );
    assert_eq!(starts.load(Ordering::SeqCst), 0);
    assert_eq!(open.load(Ordering::SeqCst), 0);
    assert_eq!(c.state(), ServiceState::NotStarted);
}

#[tokio::test]
async fn bind_failure_releases_store() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = occupied.local_addr().unwrap().port();

    let log = EventLog::default();
    let store = FakeStore::new(log.clone());
    let open = store.open_handles.clone();
    let lifecycle = LifecycleState::new();
    let listener = common::http_listener(&lifecycle, Arc::new(TypenameExecutor));
    let c = LifecycleCoordinator::new(store, listener, lifecycle, port);

    let err = c.start().await.unwrap_err();

    assert!(matches!(err, StartError::Bind(_)));
    assert_eq!(
        log.events(),
        vec!["store.connect", "store.ensure_indexes", "store.close"]
    );
    assert_eq!(open.load(Ordering::SeqCst), 0);
    assert_eq!(c.state(), ServiceState::NotStarted);
}

#[tokio::test]
async fn second_start_does_not_reacquire() {
    let log = EventLog::default();
    let c = coordinator(FakeStore::new(log.clone()), FakeListener::new(log.clone()));

    c.start().await.unwrap();
    let err = c.start().await.unwrap_err();

    assert!(matches!(err, StartError::AlreadyStarted));
    assert_eq!(log.events().len(), 3);
}

#[tokio::test]
async fn stop_before_start_is_noop() {
    let log = EventLog::default();
    let c = coordinator(FakeStore::new(log.clone()), FakeListener::new(log.clone()));

    assert_eq!(c.stop(false).await, DrainOutcome::Completed);
    assert_eq!(c.state(), ServiceState::NotStarted);
    assert!(log.events().is_empty());

    // Still startable afterwards.
    c.start().await.unwrap();
    assert_eq!(c.state(), ServiceState::Running);
}

#[tokio::test(start_paused = true)]
async fn concurrent_stops_share_one_shutdown() {
    let log = EventLog::default();
    let mut store = FakeStore::new(log.clone());
    store.close = CloseBehavior::After(Duration::from_secs(1));
    let store_closes = store.closes.clone();
    let listener = FakeListener::new(log.clone());
    let listener_closes = listener.closes.clone();
    let c = coordinator(store, listener);
    c.start().await.unwrap();

    let (first, second) = tokio::join!(c.stop(false), c.stop(false));

    assert_eq!(first, DrainOutcome::Completed);
    assert_eq!(second, DrainOutcome::Completed);
    assert_eq!(store_closes.load(Ordering::SeqCst), 1);
    assert_eq!(listener_closes.load(Ordering::SeqCst), 1);

    // Later callers observe the same outcome without more work.
    assert_eq!(c.stop(false).await, DrainOutcome::Completed);
    assert_eq!(store_closes.load(Ordering::SeqCst), 1);
    assert_eq!(c.state(), ServiceState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn hung_store_close_times_out_at_deadline() {
    let log = EventLog::default();
    let mut store = FakeStore::new(log.clone());
    store.close = CloseBehavior::Never;
    let c = coordinator(store, FakeListener::new(log.clone()));
    c.start().await.unwrap();

    let began = Instant::now();
    let outcome = c.stop(false).await;
    let elapsed = began.elapsed();

    assert_eq!(outcome, DrainOutcome::TimedOut);
    assert!(elapsed >= Duration::from_secs(30), "stopped early: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(31), "stopped late: {:?}", elapsed);
    assert_eq!(c.state(), ServiceState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn clean_drain_does_not_wait_for_deadline() {
    let log = EventLog::default();
    let mut store = FakeStore::new(log.clone());
    store.close = CloseBehavior::After(Duration::from_secs(2));
    let mut listener = FakeListener::new(log.clone());
    listener.close = CloseBehavior::After(Duration::from_secs(2));
    let c = coordinator(store, listener);
    c.start().await.unwrap();

    let began = Instant::now();
    let outcome = c.stop(false).await;
    let elapsed = began.elapsed();

    assert_eq!(outcome, DrainOutcome::Completed);
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(3), "closes ran sequentially: {:?}", elapsed);
    assert_eq!(c.state(), ServiceState::Stopped);
}

#[tokio::test(start_paused = true)]
async fn custom_drain_timeout() {
    let log = EventLog::default();
    let mut listener = FakeListener::new(log.clone());
    listener.close = CloseBehavior::Never;
    let c = coordinator(FakeStore::new(log.clone()), listener)
        .with_drain_timeout(Duration::from_secs(5));
    c.start().await.unwrap();

    let began = Instant::now();
    assert_eq!(c.stop(false).await, DrainOutcome::TimedOut);
    assert!(began.elapsed() < Duration::from_secs(6));
}

#[tokio::test(start_paused = true)]
async fn dropped_stop_leaves_shutdown_running() {
    let log = EventLog::default();
    let mut store = FakeStore::new(log.clone());
    store.close = CloseBehavior::After(Duration::from_secs(10));
    let open = store.open_handles.clone();
    let store_closes = store.closes.clone();
    let c = coordinator(store, FakeListener::new(log.clone()));
    c.start().await.unwrap();

    let abandoned = tokio::time::timeout(Duration::from_secs(1), c.stop(false)).await;
    assert!(abandoned.is_err());
    assert_eq!(c.state(), ServiceState::Draining);

    assert_eq!(c.stop(false).await, DrainOutcome::Completed);
    assert_eq!(c.state(), ServiceState::Stopped);
    assert_eq!(open.load(Ordering::SeqCst), 0);
    assert_eq!(store_closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn listener_close_error_forces_timed_out() {
    let log = EventLog::default();
    let store = FakeStore::new(log.clone());
    let store_closes = store.closes.clone();
    let mut listener = FakeListener::new(log.clone());
    listener.fail_close = true;
    let c = coordinator(store, listener);
    c.start().await.unwrap();

    assert_eq!(c.stop(false).await, DrainOutcome::TimedOut);
    assert_eq!(c.state(), ServiceState::Stopped);
    assert_eq!(store_closes.load(Ordering::SeqCst), 1);
    assert_eq!(c.stop(false).await, DrainOutcome::TimedOut);
}
