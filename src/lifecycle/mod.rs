//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (coordinator.rs):
//!     Connect store → Ensure indexes → Bind listener → Running
//!
//! Shutdown (coordinator.rs):
//!     Running → Draining (gate rejects traffic)
//!     → close listener ∥ close store, raced against the drain timeout
//!     → Stopped, report DrainOutcome
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → stop(true)
//! ```
//!
//! # Design Decisions
//! - Ordered startup; the listener starts last so traffic only arrives when ready
//! - Shutdown has a hard deadline: abandoned work is leaked, never awaited
//! - A single shutdown runs per coordinator on its own task; every `stop` call,
//!   including one that was dropped part way, shares its outcome

pub mod coordinator;
pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use coordinator::LifecycleCoordinator;
pub use shutdown::{DrainOutcome, DEFAULT_DRAIN_TIMEOUT};
pub use startup::StartError;
pub use state::{LifecycleState, ServiceState};
