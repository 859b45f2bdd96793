//! Startup failures.
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal to the boot sequence
//! - Steps run in order: store connect, store prepare, listener bind
//! - Whatever was acquired before the failing step is released first

use thiserror::Error;

use crate::net::ListenerError;
use crate::store::StoreError;

/// Errors returned by [`LifecycleCoordinator::start`](super::LifecycleCoordinator::start).
#[derive(Debug, Error)]
pub enum StartError {
    /// The database could not be reached or rejected the connection.
    #[error("store connect failed: {0}")]
    StoreConnect(#[source] StoreError),

    /// Index or constraint setup failed after connecting.
    #[error("store preparation failed: {0}")]
    StorePrepare(#[source] StoreError),

    /// The listener could not bind its port.
    #[error("listener bind failed: {0}")]
    Bind(#[source] ListenerError),

    /// `start` was called on a coordinator that is not in `NotStarted`.
    #[error("coordinator already started")]
    AlreadyStarted,
}
