//! Startup/shutdown coordination of the listener and the data store.

use std::sync::{Arc, PoisonError};
use std::time::Duration;

use tokio::sync::{watch, Mutex};

use crate::lifecycle::shutdown::{DrainOutcome, DEFAULT_DRAIN_TIMEOUT};
use crate::lifecycle::startup::StartError;
use crate::lifecycle::state::{LifecycleState, ServiceState};
use crate::net::Listener;
use crate::observability::metrics;
use crate::store::DataStore;

/// Handles owned while the service is Running or Draining.
struct Resources<S, L> {
    store: S,
    listener: L,
    port: u16,
}

/// Everything the shutdown task needs once it outlives the `stop` call that
/// spawned it.
struct Shared<S: DataStore, L: Listener> {
    store: S,
    listener: L,
    state: LifecycleState,
    resources: Mutex<Option<Resources<S::Handle, L::Handle>>>,
}

/// Brings the data store and the listener up as a unit and tears them down
/// within a bounded time.
///
/// The coordinator is the sole owner of both handles between a successful
/// [`start`](Self::start) and the first [`stop`](Self::stop). It cannot be
/// restarted once stopped.
pub struct LifecycleCoordinator<S: DataStore, L: Listener> {
    shared: Arc<Shared<S, L>>,
    port: u16,
    drain_timeout: Duration,
    // Receiver for the outcome of the one shutdown task, once spawned.
    shutdown: std::sync::Mutex<Option<watch::Receiver<Option<DrainOutcome>>>>,
}

impl<S: DataStore, L: Listener> LifecycleCoordinator<S, L> {
    /// Create a coordinator that will serve on `port`.
    ///
    /// `state` must be the same cell the listener's gating middleware reads.
    pub fn new(store: S, listener: L, state: LifecycleState, port: u16) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                listener,
                state,
                resources: Mutex::new(None),
            }),
            port,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            shutdown: std::sync::Mutex::new(None),
        }
    }

    /// Override the shutdown deadline.
    pub fn with_drain_timeout(mut self, drain_timeout: Duration) -> Self {
        self.drain_timeout = drain_timeout;
        self
    }

    pub fn state(&self) -> ServiceState {
        self.shared.state.current()
    }

    /// Port the listener actually bound, while it is held.
    pub async fn bound_port(&self) -> Option<u16> {
        self.shared.resources.lock().await.as_ref().map(|r| r.port)
    }

    /// Connect the store, prepare it, then start the listener.
    ///
    /// Returns once the listener is accepting connections. On failure every
    /// handle acquired so far is released before the error is returned.
    pub async fn start(&self) -> Result<(), StartError> {
        let shared = &*self.shared;
        let mut resources = shared.resources.lock().await;
        if resources.is_some() || shared.state.current() != ServiceState::NotStarted {
            return Err(StartError::AlreadyStarted);
        }

        let store = shared.store.connect().await.map_err(StartError::StoreConnect)?;
        tracing::debug!("Store connected");

        if let Err(e) = shared.store.ensure_indexes(&store).await {
            tracing::warn!(error = %e, "Store preparation failed, releasing connection");
            shared.store.close(store).await;
            return Err(StartError::StorePrepare(e));
        }

        let listener = match shared.listener.start(self.port).await {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!(port = self.port, error = %e, "Listener failed to start, releasing connection");
                shared.store.close(store).await;
                return Err(StartError::Bind(e));
            }
        };

        let port = shared.listener.bound_port(&listener);
        *resources = Some(Resources {
            store,
            listener,
            port,
        });
        shared
            .state
            .transition(ServiceState::NotStarted, ServiceState::Running);

        tracing::info!(port, "GraphQL gateway listening on port {}", port);
        Ok(())
    }

    /// Stop accepting work, drain, and close the store within the deadline.
    ///
    /// Safe to call at any time and from several tasks at once: the first
    /// caller spawns the shutdown, every caller waits for its outcome. The
    /// shutdown runs on its own task, so dropping a `stop` future part way
    /// does not abandon it. When `should_terminate_process` is set the process
    /// exits with [`DrainOutcome::exit_code`].
    pub async fn stop(&self, should_terminate_process: bool) -> DrainOutcome {
        if self.shared.state.current() == ServiceState::NotStarted {
            return DrainOutcome::Completed;
        }

        let mut outcome = self.shutdown_outcome();
        let outcome = match outcome.wait_for(Option::is_some).await.map(|o| *o) {
            Ok(Some(outcome)) => outcome,
            // Shutdown task panicked before reporting.
            _ => {
                tracing::error!("Shutdown task ended without an outcome");
                DrainOutcome::TimedOut
            }
        };

        if should_terminate_process {
            std::process::exit(outcome.exit_code());
        }
        outcome
    }

    /// Subscribe to the shutdown outcome, spawning the shutdown on first use.
    fn shutdown_outcome(&self) -> watch::Receiver<Option<DrainOutcome>> {
        let mut slot = self
            .shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(outcome) = slot.as_ref() {
            return outcome.clone();
        }

        let (tx, rx) = watch::channel(None);
        let shared = Arc::clone(&self.shared);
        let drain_timeout = self.drain_timeout;
        tokio::spawn(async move {
            let outcome = drain(&shared, drain_timeout).await;
            tx.send_replace(Some(outcome));
        });
        *slot = Some(rx.clone());
        rx
    }
}

/// Runs at most once per coordinator and always leaves the state Stopped.
async fn drain<S: DataStore, L: Listener>(
    shared: &Shared<S, L>,
    drain_timeout: Duration,
) -> DrainOutcome {
    if !shared
        .state
        .transition(ServiceState::Running, ServiceState::Draining)
    {
        tracing::error!(state = %shared.state.current(), "Shutdown found the service not running");
        return DrainOutcome::TimedOut;
    }

    let Some(Resources {
        store, listener, ..
    }) = shared.resources.lock().await.take()
    else {
        shared
            .state
            .transition(ServiceState::Draining, ServiceState::Stopped);
        return DrainOutcome::Completed;
    };

    tracing::info!(timeout_secs = drain_timeout.as_secs(), "Draining connections");

    let closing = async {
        let (listener_closed, ()) =
            tokio::join!(shared.listener.close(listener), shared.store.close(store));
        listener_closed
    };

    let outcome = match tokio::time::timeout(drain_timeout, closing).await {
        Ok(Ok(())) => {
            tracing::info!("connections closed cleanly");
            DrainOutcome::Completed
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "could not drain in time, forcing shutdown");
            DrainOutcome::TimedOut
        }
        Err(_) => {
            tracing::error!(
                timeout_secs = drain_timeout.as_secs(),
                "could not drain in time, forcing shutdown"
            );
            DrainOutcome::TimedOut
        }
    };

    shared
        .state
        .transition(ServiceState::Draining, ServiceState::Stopped);
    metrics::record_drain_outcome(outcome);
    outcome
}
