//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {value}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

pub(crate) fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, apply environment overrides and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProxyConfig = toml::from_str(&content)?;
    finalize(config)
}

/// Build configuration from defaults plus environment overrides.
pub fn load_from_env() -> Result<ProxyConfig, ConfigError> {
    finalize(ProxyConfig::default())
}

fn finalize(mut config: ProxyConfig) -> Result<ProxyConfig, ConfigError> {
    apply_env_overrides(&mut config, |var| std::env::var(var).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply `EDGE_PROXY_*` overrides on top of file values.
///
/// `lookup` is injected so tests do not touch the process environment.
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(secret) = lookup("EDGE_PROXY_SECRET") {
        config.auth.secret = secret;
    }
    if let Some(addr) = lookup("EDGE_PROXY_BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(url) = lookup("EDGE_PROXY_CATALOG_URL") {
        config.backends.catalog.base_url = url;
    }
    if let Some(url) = lookup("EDGE_PROXY_AVATAR_URL") {
        config.backends.avatar.base_url = url;
    }
    if let Some(id) = lookup("EDGE_PROXY_INSTANCE_ID") {
        config.observability.instance_id = id;
    }
    if let Some(level) = lookup("EDGE_PROXY_LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(value) = lookup("EDGE_PROXY_MAX_RETRIES") {
        config.retries.max_retries = value.parse().map_err(|_| ConfigError::Env {
            var: "EDGE_PROXY_MAX_RETRIES",
            value,
        })?;
    }
    Ok(())
}
