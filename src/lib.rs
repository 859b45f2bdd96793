//! GraphQL Gateway Library

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod store;

pub use config::GatewayConfig;
pub use lifecycle::{DrainOutcome, LifecycleCoordinator, LifecycleState, ServiceState, StartError};
pub use net::HttpListener;
pub use store::PgStore;
