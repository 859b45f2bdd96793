//! In-flight request tracking.
//!
//! # Responsibilities
//! - Count requests currently being served
//! - Report how much work is left when draining starts

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Tracks requests that have entered the router and not yet produced a response.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTracker {
    active_count: Arc<AtomicU64>,
}

impl ConnectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new in-flight request. Returns a guard that decrements on drop.
    pub fn track(&self) -> ConnectionGuard {
        self.active_count.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard {
            active_count: Arc::clone(&self.active_count),
        }
    }

    /// Get current in-flight request count.
    pub fn active_count(&self) -> u64 {
        self.active_count.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight count when dropped, including on panic or
/// cancellation of the request future.
#[derive(Debug)]
pub struct ConnectionGuard {
    active_count: Arc<AtomicU64>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.active_count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Middleware holding a [`ConnectionGuard`] for the duration of each request.
pub async fn track_in_flight(
    State(tracker): State<ConnectionTracker>,
    req: Request,
    next: Next,
) -> Response {
    let _guard = tracker.track();
    next.run(req).await
}
