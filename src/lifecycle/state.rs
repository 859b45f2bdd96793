//! Service state machine.
//!
//! # State Transitions
//! ```text
//! NotStarted → Running → Draining → Stopped
//! ```
//!
//! # Design Decisions
//! - One atomic cell per coordinator, cloned into the gating middleware
//! - Transitions are compare-and-swap; a lost race is a no-op
//! - Stopped is terminal

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::observability::metrics;

/// Lifecycle phase of the gateway process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ServiceState {
    /// Nothing acquired yet.
    NotStarted = 0,
    /// Store connected and listener accepting traffic.
    Running = 1,
    /// Rejecting new work while in-flight requests finish.
    Draining = 2,
    /// Terminal.
    Stopped = 3,
}

impl ServiceState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ServiceState::NotStarted,
            1 => ServiceState::Running,
            2 => ServiceState::Draining,
            _ => ServiceState::Stopped,
        }
    }

    /// Whether `self → next` is a legal single step.
    pub fn can_transition_to(self, next: ServiceState) -> bool {
        matches!(
            (self, next),
            (ServiceState::NotStarted, ServiceState::Running)
                | (ServiceState::Running, ServiceState::Draining)
                | (ServiceState::Draining, ServiceState::Stopped)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ServiceState::NotStarted => "not_started",
            ServiceState::Running => "running",
            ServiceState::Draining => "draining",
            ServiceState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared, lock-free view of the current [`ServiceState`].
///
/// Cloning is cheap and every clone observes the same cell. Only the
/// lifecycle coordinator moves the state forward; everything else reads it.
#[derive(Debug, Clone, Default)]
pub struct LifecycleState {
    inner: Arc<AtomicU8>,
}

impl LifecycleState {
    /// Create a cell in the `NotStarted` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn current(&self) -> ServiceState {
        ServiceState::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.current() == ServiceState::Running
    }

    /// Atomically move `from → to`.
    ///
    /// Returns `false` without touching the cell when the step is illegal or
    /// when the current state is not `from`.
    pub(crate) fn transition(&self, from: ServiceState, to: ServiceState) -> bool {
        if !from.can_transition_to(to) {
            return false;
        }

        let swapped = self
            .inner
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if swapped {
            tracing::debug!(from = %from, to = %to, "Service state changed");
            metrics::record_transition(to);
        }
        swapped
    }
}
