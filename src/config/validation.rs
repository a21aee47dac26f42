//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate backend URLs are absolute http(s) URLs
//! - Validate value ranges (timeouts > 0, backoff bounds)
//! - Ensure the request deadline outlasts the full retry loop
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::time::Duration;

use url::Url;

use crate::config::schema::{BackendConfig, ProxyConfig};

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("auth.secret must not be empty")]
    EmptySecret,

    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    #[error("backend {name}: invalid base_url {url:?}")]
    InvalidBackendUrl { name: String, url: String },

    #[error("backend names must be unique, {0:?} is used twice")]
    DuplicateBackend(String),

    #[error("routes.health_path must start with '/'")]
    InvalidHealthPath,

    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },

    #[error("retries.backoff_max_ms must be >= retries.backoff_base_ms")]
    BackoffBounds,

    #[error(
        "timeouts.request_secs ({request_secs}s) must exceed the worst-case upstream time ({worst_case_ms}ms)"
    )]
    RequestDeadline { request_secs: u64, worst_case_ms: u64 },
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.auth.secret.is_empty() {
        errors.push(ValidationError::EmptySecret);
    }
    if config.auth.header_name.is_empty() {
        errors.push(ValidationError::EmptyField { field: "auth.header_name" });
    }
    if config.auth.query_param.is_empty() {
        errors.push(ValidationError::EmptyField { field: "auth.query_param" });
    }
    if config.routes.bypass_param.is_empty() {
        errors.push(ValidationError::EmptyField { field: "routes.bypass_param" });
    }
    if config.observability.instance_id.is_empty() {
        errors.push(ValidationError::EmptyField { field: "observability.instance_id" });
    }

    check_backend(&config.backends.catalog, &mut errors);
    check_backend(&config.backends.avatar, &mut errors);
    if config.backends.catalog.name == config.backends.avatar.name {
        errors.push(ValidationError::DuplicateBackend(config.backends.catalog.name.clone()));
    }

    if !config.routes.health_path.starts_with('/') {
        errors.push(ValidationError::InvalidHealthPath);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "timeouts.request_secs" });
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "timeouts.upstream_secs" });
    }

    if config.retries.backoff_max_ms < config.retries.backoff_base_ms {
        errors.push(ValidationError::BackoffBounds);
    }

    // A deadline that fires mid-retry would answer with a bare timeout status.
    if config.timeouts.request_secs > 0 && config.timeouts.upstream_secs > 0 {
        let worst_case = worst_case_upstream(config);
        if Duration::from_secs(config.timeouts.request_secs) <= worst_case {
            errors.push(ValidationError::RequestDeadline {
                request_secs: config.timeouts.request_secs,
                worst_case_ms: u64::try_from(worst_case.as_millis()).unwrap_or(u64::MAX),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Longest a single fetch can run: every attempt hitting the upstream
/// timeout, plus the largest jittered backoff before each retry.
pub fn worst_case_upstream(config: &ProxyConfig) -> Duration {
    let retries = u64::from(config.retries.max_retries);
    let attempts = retries.saturating_add(1);
    let per_attempt = config.timeouts.upstream_secs.saturating_mul(1000);
    let per_backoff = if config.retries.backoff_base_ms == 0 {
        0
    } else {
        let max = config.retries.backoff_max_ms;
        max.saturating_add(max / 10)
    };
    Duration::from_millis(
        attempts
            .saturating_mul(per_attempt)
            .saturating_add(retries.saturating_mul(per_backoff)),
    )
}

fn check_backend(backend: &BackendConfig, errors: &mut Vec<ValidationError>) {
    if backend.name.is_empty() {
        errors.push(ValidationError::EmptyField { field: "backends.*.name" });
    }
    let valid = Url::parse(&backend.base_url)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .unwrap_or(false);
    if !valid {
        errors.push(ValidationError::InvalidBackendUrl {
            name: backend.name.clone(),
            url: backend.base_url.clone(),
        });
    }
}
