//! Upstream fetch with bounded retry.

use std::sync::Arc;

use axum::body::Bytes;

use crate::cache::CachePolicy;
use crate::observability::metrics;
use crate::resilience::RetryPolicy;
use crate::upstream::transport::{Transport, TransportError, UpstreamRequest};

/// Final result of a fetch, consumed by the response composer.
#[derive(Debug, Clone)]
pub struct UpstreamOutcome {
    pub status: u16,
    pub body: Bytes,
    pub attempts: u32,
    pub policy: CachePolicy,
    pub backend: String,
}

/// How an upstream status is reported in logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeClass {
    Success,
    /// 429/5xx, still failing after the retry budget.
    TransientFailure,
    /// Any other 4xx.
    HardFailure,
}

impl OutcomeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::TransientFailure => "transient_failure",
            Self::HardFailure => "hard_failure",
        }
    }
}

impl UpstreamOutcome {
    pub fn classify(&self) -> OutcomeClass {
        if crate::resilience::is_retryable_status(self.status) {
            OutcomeClass::TransientFailure
        } else if self.status >= 400 {
            OutcomeClass::HardFailure
        } else {
            OutcomeClass::Success
        }
    }
}

/// No response object could be obtained from upstream.
#[derive(Debug, Clone, thiserror::Error)]
#[error("upstream {backend} unreachable after {attempts} attempt(s): {source}")]
pub struct FetchError {
    pub backend: String,
    pub attempts: u32,
    pub policy: CachePolicy,
    pub source: TransportError,
}

pub type FetchResult = Result<UpstreamOutcome, FetchError>;

/// Performs upstream calls through a [`Transport`] with a retry budget.
#[derive(Clone)]
pub struct UpstreamFetcher {
    transport: Arc<dyn Transport>,
    retry: RetryPolicy,
}

impl UpstreamFetcher {
    pub fn new(transport: Arc<dyn Transport>, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub async fn fetch(&self, request: UpstreamRequest) -> FetchResult {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.transport.send(&request).await {
                Ok(response) => {
                    if self.retry.should_retry(attempt, response.status) {
                        tracing::info!(
                            backend = %request.backend,
                            url = %request.url,
                            attempt,
                            status = response.status,
                            "Retrying upstream request"
                        );
                        self.pause(attempt).await;
                        continue;
                    }

                    metrics::record_upstream_attempts(&request.backend, attempt);
                    return Ok(UpstreamOutcome {
                        status: response.status,
                        body: response.body,
                        attempts: attempt,
                        policy: request.policy,
                        backend: request.backend,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        backend = %request.backend,
                        url = %request.url,
                        attempt,
                        error = %e,
                        "Upstream transport error"
                    );
                    if self.retry.has_budget(attempt) {
                        self.pause(attempt).await;
                        continue;
                    }

                    metrics::record_upstream_attempts(&request.backend, attempt);
                    return Err(FetchError {
                        backend: request.backend,
                        attempts: attempt,
                        policy: request.policy,
                        source: e,
                    });
                }
            }
        }
    }

    async fn pause(&self, attempt: u32) {
        let delay = self.retry.delay(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::upstream::transport::UpstreamResponse;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed sequence of attempt results.
    struct Scripted {
        script: Mutex<VecDeque<Result<u16, TransportError>>>,
        calls: Mutex<u32>,
    }

    impl Scripted {
        fn new(script: Vec<Result<u16, TransportError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&self, _request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
            *self.calls.lock().unwrap() += 1;
            let next = self.script.lock().unwrap().pop_front().expect("script exhausted");
            next.map(|status| UpstreamResponse {
                status,
                body: Bytes::from(format!("{{\"status\":{status}}}")),
            })
        }
    }

    fn request() -> UpstreamRequest {
        UpstreamRequest {
            url: "http://avatar.test/v1/users/1/avatar".parse().unwrap(),
            policy: CachePolicy::Pass,
            backend: "avatar".into(),
        }
    }

    fn fetcher(transport: Arc<Scripted>, max_retries: u32) -> UpstreamFetcher {
        let retry = RetryPolicy::new(&RetryConfig {
            max_retries,
            ..RetryConfig::default()
        });
        UpstreamFetcher::new(transport, retry)
    }

    #[tokio::test]
    async fn test_retry_then_success() {
        let transport = Scripted::new(vec![Ok(500), Ok(200)]);
        let outcome = fetcher(transport.clone(), 1).fetch(request()).await.unwrap();

        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.body, Bytes::from_static(b"{\"status\":200}"));
        assert_eq!(outcome.classify(), OutcomeClass::Success);
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test]
    async fn test_non_retryable_returns_immediately() {
        let transport = Scripted::new(vec![Ok(404)]);
        let outcome = fetcher(transport.clone(), 1).fetch(request()).await.unwrap();

        assert_eq!(outcome.status, 404);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.classify(), OutcomeClass::HardFailure);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_budget_passes_status_through() {
        let transport = Scripted::new(vec![Ok(429), Ok(503)]);
        let outcome = fetcher(transport.clone(), 1).fetch(request()).await.unwrap();

        assert_eq!(outcome.status, 503);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.classify(), OutcomeClass::TransientFailure);
    }

    #[tokio::test]
    async fn test_larger_budget() {
        let transport = Scripted::new(vec![Ok(502), Ok(502), Ok(502), Ok(201)]);
        let outcome = fetcher(transport.clone(), 3).fetch(request()).await.unwrap();
        assert_eq!(outcome.status, 201);
        assert_eq!(outcome.attempts, 4);
    }

    #[tokio::test]
    async fn test_transport_error_retried_then_recovers() {
        let transport = Scripted::new(vec![Err(TransportError::Timeout), Ok(200)]);
        let outcome = fetcher(transport.clone(), 1).fetch(request()).await.unwrap();
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.attempts, 2);
    }

    #[tokio::test]
    async fn test_unreachable_after_budget() {
        let transport = Scripted::new(vec![
            Err(TransportError::Connect("refused".into())),
            Err(TransportError::Connect("refused".into())),
        ]);
        let err = fetcher(transport.clone(), 1).fetch(request()).await.unwrap_err();

        assert_eq!(err.attempts, 2);
        assert_eq!(err.backend, "avatar");
        assert_eq!(err.source, TransportError::Connect("refused".into()));
        assert!(err.policy.is_pass());
    }

    #[tokio::test]
    async fn test_outcome_keeps_policy() {
        let transport = Scripted::new(vec![Ok(200)]);
        let mut req = request();
        req.policy = crate::cache::PolicySelector::default()
            .select(crate::routing::RouteKind::AvatarInfo, false);
        let outcome = fetcher(transport, 1).fetch(req).await.unwrap();
        assert!(!outcome.policy.is_pass());
    }
}
