//! Data store subsystem.
//!
//! # Data Flow
//! ```text
//! LifecycleCoordinator::start
//!     → DataStore::connect        (open the pool)
//!     → DataStore::ensure_indexes (index/constraint setup)
//! LifecycleCoordinator::stop
//!     → DataStore::close          (wait for the pool to shut down)
//! ```
//!
//! # Design Decisions
//! - The store hands out an opaque handle; the coordinator owns it
//! - `close` never fails outward, it only logs

pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

pub use postgres::PgStore;

/// Errors raised while connecting or preparing the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database is unreachable or refused the connection.
    #[error("connection failed: {0}")]
    Connect(#[source] sqlx::Error),

    /// An index statement failed.
    #[error("index `{name}` could not be created: {source}")]
    Index {
        name: String,
        #[source]
        source: sqlx::Error,
    },
}

/// Owner of the database connection/session.
#[async_trait]
pub trait DataStore: Send + Sync + 'static {
    /// Live connection handle.
    type Handle: Send + 'static;

    /// Open a connection.
    async fn connect(&self) -> Result<Self::Handle, StoreError>;

    /// Create the indexes and constraints the service relies on.
    async fn ensure_indexes(&self, handle: &Self::Handle) -> Result<(), StoreError>;

    /// Release the connection, resolving once the session is closed.
    async fn close(&self, handle: Self::Handle);
}
