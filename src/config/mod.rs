//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML) + EDGE_PROXY_* environment
//!     → loader.rs (parse, deserialize, apply env overrides)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → compiled into a serving snapshot (routes, policies, auth)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of the serving snapshot
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults except the shared secret
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    AuthConfig, BackendConfig, BackendsConfig, CacheConfig, ListenerConfig, LogFormat,
    ObservabilityConfig, ProxyConfig, RetryConfig, RoutePolicyConfig, RoutesConfig,
    TimeoutConfig,
};
