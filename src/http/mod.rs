//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (net::listener)
//!     → middleware/drain_gate.rs (503 unless Running)
//!     → request.rs (request ID), trace, timeout, metrics
//!     → server.rs (route /graphql, 404 fallback)
//!     → graphql.rs (decode envelope, execute)
//!     → response.rs (errors as {"error": ..})
//! ```

pub mod graphql;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use graphql::{GraphQlRequest, QueryExecutor, TypenameExecutor};
pub use request::X_REQUEST_ID;
pub use response::ApiError;
pub use server::{build_router, AppState};
