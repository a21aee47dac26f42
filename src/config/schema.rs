//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge cache proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Shared-secret authentication.
    pub auth: AuthConfig,

    /// Upstream API definitions.
    pub backends: BackendsConfig,

    /// Per-route cache policy.
    pub cache: CacheConfig,

    /// Upstream retry configuration.
    pub retries: RetryConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Route surface settings.
    pub routes: RoutesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Shared-secret authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// The shared secret. Must be set through the file or `EDGE_PROXY_SECRET`.
    pub secret: String,

    /// Header carrying the credential.
    pub header_name: String,

    /// Query parameter carrying the credential. Always stripped before forwarding.
    pub query_param: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            header_name: "x-app-key".to_string(),
            query_param: "key".to_string(),
        }
    }
}

/// Upstream API definitions, one per backend id.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendsConfig {
    /// Catalog API (asset bundles).
    pub catalog: BackendConfig,

    /// Avatar API (avatar info and outfits).
    pub avatar: BackendConfig,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            catalog: BackendConfig {
                name: "catalog".to_string(),
                base_url: "https://catalog.roblox.com".to_string(),
            },
            avatar: BackendConfig {
                name: "avatar".to_string(),
                base_url: "https://avatar.roblox.com".to_string(),
            },
        }
    }
}

/// A single upstream backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Backend identifier used in cache keys, logs and metrics.
    pub name: String,

    /// Absolute base URL (scheme + host, optional port).
    pub base_url: String,
}

/// Per-route cache policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub catalog_bundles: RoutePolicyConfig,
    pub avatar_info: RoutePolicyConfig,
    pub avatar_outfits: RoutePolicyConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            // Bundle data is near-immutable: long TTL, no revalidation window.
            catalog_bundles: RoutePolicyConfig {
                ttl_secs: 7 * 24 * 3600,
                stale_while_revalidate_secs: None,
                stale_if_error_secs: Some(7 * 24 * 3600),
            },
            avatar_info: RoutePolicyConfig {
                ttl_secs: 15 * 60,
                stale_while_revalidate_secs: Some(30 * 60),
                stale_if_error_secs: Some(2 * 3600),
            },
            avatar_outfits: RoutePolicyConfig {
                ttl_secs: 10 * 60,
                stale_while_revalidate_secs: Some(15 * 60),
                stale_if_error_secs: Some(3600),
            },
        }
    }
}

/// Freshness windows for one route kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RoutePolicyConfig {
    /// Time a cached response stays fresh.
    pub ttl_secs: u64,

    /// Window after expiry during which stale content may be served while refreshing.
    #[serde(default)]
    pub stale_while_revalidate_secs: Option<u64>,

    /// Window during which stale content may be served if a refresh fails.
    #[serde(default)]
    pub stale_if_error_secs: Option<u64>,
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt (total attempts = 1 + max_retries).
    pub max_retries: u32,

    /// Base delay for exponential backoff in milliseconds. Zero retries immediately.
    pub backoff_base_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub backoff_max_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff_base_ms: 0,
            backoff_max_ms: 2000,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,

    /// Per-attempt upstream timeout in seconds.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            upstream_secs: 10,
        }
    }
}

/// Route surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Health check path.
    pub health_path: String,

    /// Query parameter that forces a cache bypass on avatar routes.
    pub bypass_param: String,

    /// Query forced onto every catalog bundles request, in `name=value&...` form.
    pub catalog_forced_query: String,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            health_path: "/ping".to_string(),
            bypass_param: "nocache".to_string(),
            catalog_forced_query: "limit=100&sortOrder=Asc".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Static identifier reported in the `x-edge-instance` header.
    pub instance_id: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            instance_id: "edge-proxy".to_string(),
        }
    }
}
