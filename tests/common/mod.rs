//! Shared fakes and helpers for integration tests.
#![allow(dead_code)]

use std::net::TcpListener as StdTcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use graphql_gateway::net::{Listener, ListenerError};
use graphql_gateway::store::{DataStore, StoreError};
use tokio::sync::Notify;

/// Ordered record of collaborator calls, shared between fakes.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<&'static str>>>);

impl EventLog {
    pub fn push(&self, event: &'static str) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }
}

/// How a fake collaborator's close behaves.
#[derive(Debug, Clone)]
pub enum CloseBehavior {
    Immediate,
    After(Duration),
    Never,
    /// Wait until the notifier fires.
    Until(Arc<Notify>),
}

impl CloseBehavior {
    async fn run(&self) {
        match self {
            CloseBehavior::Immediate => {}
            CloseBehavior::After(delay) => tokio::time::sleep(*delay).await,
            CloseBehavior::Never => std::future::pending::<()>().await,
            CloseBehavior::Until(notify) => notify.notified().await,
        }
    }
}

/// In-memory [`DataStore`] with fault injection.
pub struct FakeStore {
    pub log: EventLog,
    pub fail_connect: bool,
    pub fail_prepare: bool,
    pub close: CloseBehavior,
    pub open_handles: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl FakeStore {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            fail_connect: false,
            fail_prepare: false,
            close: CloseBehavior::Immediate,
            open_handles: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

pub struct FakeSession;

#[async_trait]
impl DataStore for FakeStore {
    type Handle = FakeSession;

    async fn connect(&self) -> Result<FakeSession, StoreError> {
        self.log.push("store.connect");
        if self.fail_connect {
            return Err(StoreError::Connect(sqlx::Error::PoolTimedOut));
        }
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Ok(FakeSession)
    }

    async fn ensure_indexes(&self, _handle: &FakeSession) -> Result<(), StoreError> {
        self.log.push("store.ensure_indexes");
        if self.fail_prepare {
            return Err(StoreError::Index {
                name: "users_email_idx".into(),
                source: sqlx::Error::Protocol("injected".into()),
            });
        }
        Ok(())
    }

    async fn close(&self, _handle: FakeSession) {
        self.log.push("store.close");
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.close.run().await;
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

/// [`Listener`] that binds nothing.
pub struct FakeListener {
    pub log: EventLog,
    pub close: CloseBehavior,
    /// Report a serve error from `close` after its delay.
    pub fail_close: bool,
    pub starts: Arc<AtomicUsize>,
    pub closes: Arc<AtomicUsize>,
}

impl FakeListener {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            close: CloseBehavior::Immediate,
            fail_close: false,
            starts: Arc::new(AtomicUsize::new(0)),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Listener for FakeListener {
    type Handle = u16;

    async fn start(&self, port: u16) -> Result<u16, ListenerError> {
        self.log.push("listener.start");
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(port)
    }

    fn bound_port(&self, handle: &u16) -> u16 {
        *handle
    }

    async fn close(&self, _handle: u16) -> Result<(), ListenerError> {
        self.log.push("listener.close");
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.close.run().await;
        if self.fail_close {
            return Err(ListenerError::Serve(std::io::Error::new(
                std::io::ErrorKind::Other,
                "injected",
            )));
        }
        Ok(())
    }
}

/// A port nothing is listening on right now.
pub fn free_port() -> u16 {
    let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// Client without connection reuse, so every request opens a fresh socket.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

/// Real listener on 127.0.0.1 serving the gateway router gated by `lifecycle`.
pub fn http_listener(
    lifecycle: &graphql_gateway::LifecycleState,
    executor: Arc<dyn graphql_gateway::http::QueryExecutor>,
) -> graphql_gateway::HttpListener {
    use graphql_gateway::config::{Environment, GatewayConfig};
    use graphql_gateway::http::{build_router, AppState};
    use graphql_gateway::net::ConnectionTracker;

    let tracker = ConnectionTracker::new();
    let router = build_router(
        &GatewayConfig::default(),
        AppState::new(executor, Environment::Test),
        lifecycle.clone(),
        tracker.clone(),
    );
    graphql_gateway::HttpListener::new("127.0.0.1", router, tracker)
}
