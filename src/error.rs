//! Proxy-originated error conditions.
//!
//! Upstream statuses are not errors here: they pass through verbatim. Only
//! conditions the proxy itself detects get a proxy-chosen status code.

use axum::http::StatusCode;

use crate::cache::{CacheDisposition, ProducerAborted};
use crate::upstream::FetchError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ProxyError {
    /// Neither the header nor the query credential matched.
    #[error("forbidden")]
    AuthRejected,

    /// Method/path is not one of the allow-listed routes.
    #[error("no route for {method} {path}")]
    RouteUnmatched { method: String, path: String },

    /// No response could be obtained from upstream.
    #[error(transparent)]
    UpstreamUnreachable(#[from] FetchError),

    /// The in-flight producer died without producing an outcome.
    #[error(transparent)]
    Internal(#[from] ProducerAborted),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::AuthRejected => StatusCode::FORBIDDEN,
            Self::RouteUnmatched { .. } => StatusCode::BAD_REQUEST,
            Self::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Cache disposition reported for this error.
    pub fn disposition(&self) -> CacheDisposition {
        match self {
            Self::UpstreamUnreachable(e) => e.policy.disposition(),
            _ => CacheDisposition::Bypass,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthRejected => "auth_rejected",
            Self::RouteUnmatched { .. } => "route_unmatched",
            Self::UpstreamUnreachable(_) => "upstream_unreachable",
            Self::Internal(_) => "internal",
        }
    }
}
