//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, pool size > 0)
//! - Reject index identifiers that are not plain SQL names
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener port is required (set PORT or listener.port)")]
    MissingPort,

    #[error("database url must not be empty")]
    EmptyDatabaseUrl,

    #[error("database.max_connections must be greater than zero")]
    ZeroPoolSize,

    #[error("shutdown.drain_timeout_secs must be greater than zero")]
    ZeroDrainTimeout,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("index `{index}` has no columns")]
    EmptyIndexColumns { index: String },

    #[error("index `{index}`: `{identifier}` is not a valid identifier")]
    InvalidIdentifier { index: String, identifier: String },
}

/// Check the configuration, collecting every error.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.port.is_none() {
        errors.push(ValidationError::MissingPort);
    }
    if config.database.url.trim().is_empty() {
        errors.push(ValidationError::EmptyDatabaseUrl);
    }
    if config.database.max_connections == 0 {
        errors.push(ValidationError::ZeroPoolSize);
    }
    if config.shutdown.drain_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDrainTimeout);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    for index in &config.database.indexes {
        if index.columns.is_empty() {
            errors.push(ValidationError::EmptyIndexColumns {
                index: index.name.clone(),
            });
        }

        let names = std::iter::once(&index.name).chain(index.columns.iter());
        for identifier in names {
            if !is_plain_identifier(identifier) {
                errors.push(ValidationError::InvalidIdentifier {
                    index: index.name.clone(),
                    identifier: identifier.clone(),
                });
            }
        }
        if !index.table.split('.').all(is_plain_identifier) {
            errors.push(ValidationError::InvalidIdentifier {
                index: index.name.clone(),
                identifier: index.table.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_plain_identifier(identifier: &str) -> bool {
    let mut chars = identifier.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
