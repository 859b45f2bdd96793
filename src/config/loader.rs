//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use crate::config::schema::{Environment, GatewayConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Env { var: &'static str, reason: String },
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Env { var, reason } => write!(f, "Invalid {}: {}", var, reason),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load configuration from an optional TOML file, apply process environment
/// overrides and validate the result.
///
/// The environment is read exactly once, here.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    load_config_with_env(path, |var| std::env::var(var).ok())
}

/// [`load_config`] with an explicit environment lookup.
pub fn load_config_with_env<F>(path: Option<&Path>, env: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, env)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay `PORT`, `HOST`, `DATABASE_URL` and `APP_ENV` onto the file config.
fn apply_env_overrides<F>(config: &mut GatewayConfig, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = env("PORT") {
        let port = port.trim().parse::<u16>().map_err(|e| ConfigError::Env {
            var: "PORT",
            reason: e.to_string(),
        })?;
        config.listener.port = Some(port);
    }
    if let Some(host) = env("HOST") {
        config.listener.host = host;
    }
    if let Some(url) = env("DATABASE_URL") {
        config.database.url = url;
    }
    if let Some(environment) = env("APP_ENV") {
        config.environment = environment
            .parse::<Environment>()
            .map_err(|reason| ConfigError::Env { var: "APP_ENV", reason })?;
    }
    Ok(())
}
