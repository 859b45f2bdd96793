//! TCP listener serving the gateway router.
//!
//! # Responsibilities
//! - Bind to the configured host and port
//! - Serve the axum router on a background task
//! - Graceful close: stop accepting, let in-flight requests finish

use std::net::SocketAddr;

use async_trait::async_trait;
use axum::Router;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::net::connection::ConnectionTracker;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The serve loop stopped with an I/O error.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    /// The serve task panicked or was cancelled.
    #[error("server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Accepts inbound connections and dispatches them to request handling.
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    /// Handle to a running listener.
    type Handle: Send + 'static;

    /// Bind `port` and begin serving. Resolves once connections are accepted.
    async fn start(&self, port: u16) -> Result<Self::Handle, ListenerError>;

    /// Port actually bound (differs from the requested one for port 0).
    fn bound_port(&self, handle: &Self::Handle) -> u16;

    /// Stop accepting connections and resolve when the last one has closed.
    async fn close(&self, handle: Self::Handle) -> Result<(), ListenerError>;
}

/// [`Listener`] serving an axum [`Router`] over plain TCP.
#[derive(Clone)]
pub struct HttpListener {
    host: String,
    router: Router,
    tracker: ConnectionTracker,
}

impl HttpListener {
    /// `router` should already carry the gating middleware; `tracker` should be
    /// the one installed in it.
    pub fn new(host: impl Into<String>, router: Router, tracker: ConnectionTracker) -> Self {
        Self {
            host: host.into(),
            router,
            tracker,
        }
    }
}

/// A running [`HttpListener`].
#[derive(Debug)]
pub struct ServingHandle {
    local_addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServingHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait]
impl Listener for HttpListener {
    type Handle = ServingHandle;

    async fn start(&self, port: u16) -> Result<ServingHandle, ListenerError> {
        let address = format!("{}:{}", self.host, port);
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ListenerError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::Bind { address, source })?;

        tracing::debug!(address = %local_addr, "Listener bound");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let router = self.router.clone();
        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    // A dropped sender also means shut down.
                    shutdown_rx.await.ok();
                })
                .await
        });

        Ok(ServingHandle {
            local_addr,
            shutdown_tx,
            task,
        })
    }

    fn bound_port(&self, handle: &ServingHandle) -> u16 {
        handle.local_addr.port()
    }

    async fn close(&self, handle: ServingHandle) -> Result<(), ListenerError> {
        tracing::info!(
            address = %handle.local_addr,
            in_flight = self.tracker.active_count(),
            "Listener closing"
        );

        // The serve task may already have exited on its own; its result below
        // says why.
        handle.shutdown_tx.send(()).ok();

        handle.task.await?.map_err(ListenerError::Serve)?;

        tracing::debug!(address = %handle.local_addr, "Listener closed");
        Ok(())
    }
}
