//! Outbound HTTP transport.
//!
//! The transport performs exactly one attempt. Retry decisions belong to the
//! fetcher; the cache policy rides along on the request so the transport can
//! signal a bypass to the upstream cache layer.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::header::{ACCEPT, CACHE_CONTROL};
use url::Url;

use crate::cache::CachePolicy;
use crate::config::TimeoutConfig;

/// A single outbound call with its cache policy attached.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub url: Url,
    pub policy: CachePolicy,
    /// Backend id, for logs and metrics.
    pub backend: String,
}

/// Raw upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Bytes,
}

/// Failure below the HTTP layer: no status code was obtained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("timed out")]
    Timeout,

    #[error("request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Something that can perform one upstream attempt.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError>;
}

/// Production transport over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.upstream_secs))
            .connect_timeout(Duration::from_secs(timeouts.upstream_secs))
            .user_agent(concat!("edge-cache-proxy/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        let mut builder = self
            .client
            .get(request.url.clone())
            .header(ACCEPT, "application/json");
        if request.policy.is_pass() {
            builder = builder.header(CACHE_CONTROL, "no-cache");
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(UpstreamResponse { status, body })
    }
}
