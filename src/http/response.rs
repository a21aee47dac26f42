//! Response composition.
//!
//! # Responsibilities
//! - Pass upstream status and body through unmodified
//! - Attach CORS, diagnostic and cache-control headers to every response
//! - Build the fixed JSON bodies for proxy-originated responses
//!
//! # Design Decisions
//! - Synthetic responses (health, 400, 403, 5xx) are always `no-store`
//!   and report `x-upstream-status: 0`
//! - Diagnostic headers are present on every path, including errors

use axum::{
    body::Body,
    http::{
        header::{self, InvalidHeaderValue},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::Response,
};
use serde_json::json;

use crate::cache::CacheDisposition;
use crate::error::ProxyError;
use crate::upstream::UpstreamOutcome;

/// Diagnostic header names.
pub mod header_names {
    /// Upstream HTTP status (`0` when no response was obtained).
    pub const X_UPSTREAM_STATUS: &str = "x-upstream-status";
    /// Number of upstream attempts behind this response.
    pub const X_UPSTREAM_ATTEMPTS: &str = "x-upstream-attempts";
    /// Cache disposition: OVERRIDE or BYPASS.
    pub const X_CACHE_POLICY: &str = "x-cache-policy";
    /// Static identifier of this proxy instance.
    pub const X_EDGE_INSTANCE: &str = "x-edge-instance";
}

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
const PREFLIGHT_MAX_AGE_SECS: &str = "86400";

/// Builds every outbound response.
#[derive(Debug, Clone)]
pub struct ResponseComposer {
    instance_id: HeaderValue,
    supported_routes: Vec<String>,
}

impl ResponseComposer {
    pub fn new(instance_id: &str, supported_routes: Vec<String>) -> Result<Self, InvalidHeaderValue> {
        Ok(Self {
            instance_id: HeaderValue::from_str(instance_id)?,
            supported_routes,
        })
    }

    /// Upstream passthrough: status and body bytes unchanged.
    pub fn passthrough(&self, outcome: &UpstreamOutcome) -> Response {
        // reqwest only yields valid status codes; the fallback is unreachable in practice.
        let status = StatusCode::from_u16(outcome.status).unwrap_or(StatusCode::BAD_GATEWAY);
        let mut response = Response::new(Body::from(outcome.body.clone()));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        self.common_headers(headers, outcome.policy.disposition());
        headers.insert(header_names::X_UPSTREAM_STATUS, HeaderValue::from(outcome.status));
        headers.insert(header_names::X_UPSTREAM_ATTEMPTS, HeaderValue::from(outcome.attempts));
        if let Ok(value) = HeaderValue::from_str(&outcome.policy.cache_control()) {
            headers.insert(header::CACHE_CONTROL, value);
        }
        response
    }

    /// Proxy-originated failure.
    pub fn error(&self, err: &ProxyError) -> Response {
        let body = match err {
            ProxyError::AuthRejected => json!({ "error": "Forbidden" }),
            ProxyError::RouteUnmatched { .. } => json!({
                "error": "unsupported route",
                "routes": self.supported_routes,
            }),
            ProxyError::UpstreamUnreachable(e) => json!({
                "error": "upstream unreachable",
                "backend": e.backend,
                "attempts": e.attempts,
            }),
            ProxyError::Internal(_) => json!({ "error": "internal error" }),
        };

        let mut response = self.synthetic(err.status(), &body, err.disposition());
        if let ProxyError::UpstreamUnreachable(e) = err {
            response
                .headers_mut()
                .insert(header_names::X_UPSTREAM_ATTEMPTS, HeaderValue::from(e.attempts));
        }
        response
    }

    /// Health check body: `{ok, time}`.
    pub fn health(&self) -> Response {
        let body = json!({
            "ok": true,
            "time": chrono::Utc::now().to_rfc3339(),
        });
        self.synthetic(StatusCode::OK, &body, CacheDisposition::Bypass)
    }

    /// CORS preflight acknowledgment.
    pub fn preflight(&self) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;

        let headers = response.headers_mut();
        cors_headers(headers);
        headers.insert(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from_static(PREFLIGHT_MAX_AGE_SECS),
        );
        headers.insert(header_names::X_EDGE_INSTANCE, self.instance_id.clone());
        response
    }

    fn synthetic(&self, status: StatusCode, body: &serde_json::Value, disposition: CacheDisposition) -> Response {
        let mut response = Response::new(Body::from(body.to_string()));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        self.common_headers(headers, disposition);
        headers.insert(header_names::X_UPSTREAM_STATUS, HeaderValue::from(0u16));
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }

    fn common_headers(&self, headers: &mut HeaderMap, disposition: CacheDisposition) {
        cors_headers(headers);
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(
            header_names::X_CACHE_POLICY,
            HeaderValue::from_static(disposition.as_str()),
        );
        headers.insert(header_names::X_EDGE_INSTANCE, self.instance_id.clone());
    }
}

fn cors_headers(headers: &mut HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
}
