//! Shared-secret authentication gate.
//!
//! The credential may arrive in a header or a query parameter. The query
//! form is always stripped so it never reaches the cache key or upstream.

use axum::http::{HeaderMap, HeaderName};

use crate::config::AuthConfig;
use crate::error::ProxyError;
use crate::routing::QueryParams;

#[derive(Debug, Clone)]
pub struct AuthGate {
    secret: String,
    header: HeaderName,
    query_param: String,
}

impl AuthGate {
    pub fn new(config: &AuthConfig) -> Result<Self, axum::http::header::InvalidHeaderName> {
        Ok(Self {
            secret: config.secret.clone(),
            header: HeaderName::from_bytes(config.header_name.as_bytes())?,
            query_param: config.query_param.clone(),
        })
    }

    /// Name of the query parameter carrying the credential.
    pub fn query_param(&self) -> &str {
        &self.query_param
    }

    /// Validate the request credential, removing the query credential from `params`.
    pub fn check(&self, headers: &HeaderMap, params: &mut QueryParams) -> Result<(), ProxyError> {
        let from_query = params.remove(&self.query_param);

        let header_ok = headers
            .get(&self.header)
            .is_some_and(|v| self.matches(v.as_bytes()));
        let query_ok = from_query.iter().any(|v| self.matches(v.as_bytes()));

        if header_ok || query_ok {
            Ok(())
        } else {
            Err(ProxyError::AuthRejected)
        }
    }

    fn matches(&self, candidate: &[u8]) -> bool {
        !self.secret.is_empty() && constant_time_eq(candidate, self.secret.as_bytes())
    }
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn gate() -> AuthGate {
        AuthGate::new(&AuthConfig {
            secret: "SECRET".into(),
            ..AuthConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_header_credential() {
        let mut headers = HeaderMap::new();
        headers.insert("x-app-key", HeaderValue::from_static("SECRET"));
        let mut params = QueryParams::parse(Some("x=1"));

        assert!(gate().check(&headers, &mut params).is_ok());
        assert_eq!(params.canonical(&[]), "x=1");
    }

    #[test]
    fn test_query_credential_is_stripped() {
        let mut params = QueryParams::parse(Some("key=SECRET&x=1"));
        assert!(gate().check(&HeaderMap::new(), &mut params).is_ok());
        assert_eq!(params.get("key"), None);
        assert_eq!(params.canonical(&[]), "x=1");
    }

    #[test]
    fn test_missing_credential_rejected() {
        let mut params = QueryParams::parse(None);
        let err = gate().check(&HeaderMap::new(), &mut params).unwrap_err();
        assert!(matches!(err, ProxyError::AuthRejected));
    }

    #[test]
    fn test_wrong_credentials_rejected() {
        let mut headers = HeaderMap::new();
        headers.insert("x-app-key", HeaderValue::from_static("nope"));
        let mut params = QueryParams::parse(Some("key=SECRE"));
        assert!(gate().check(&headers, &mut params).is_err());
    }

    #[test]
    fn test_wrong_query_key_still_stripped_when_header_valid() {
        let mut headers = HeaderMap::new();
        headers.insert("x-app-key", HeaderValue::from_static("SECRET"));
        let mut params = QueryParams::parse(Some("key=junk&a=1"));

        assert!(gate().check(&headers, &mut params).is_ok());
        assert_eq!(params.canonical(&[]), "a=1");
    }

    #[test]
    fn test_empty_secret_never_matches() {
        let gate = AuthGate::new(&AuthConfig::default()).unwrap();
        let mut params = QueryParams::parse(Some("key="));
        assert!(gate.check(&HeaderMap::new(), &mut params).is_err());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
