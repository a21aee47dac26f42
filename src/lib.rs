//! Edge Cache Proxy Library
//!
//! A reverse proxy for a fixed set of read-only upstream JSON APIs that adds
//! shared-secret auth, query canonicalization, per-route cache policy,
//! in-flight request coalescing and bounded retry.

pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;
pub mod upstream;

pub use config::ProxyConfig;
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
