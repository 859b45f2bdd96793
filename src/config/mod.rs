//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (PORT, HOST, DATABASE_URL, APP_ENV)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is read once at process start and never re-read
//! - All fields have defaults except the listening port
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    DatabaseConfig, Environment, GatewayConfig, IndexConfig, ListenerConfig, LogFormat,
    ObservabilityConfig,
};
