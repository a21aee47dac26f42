//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body, Bytes};
use axum::http::Request;
use axum::response::Response;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use edge_cache_proxy::config::ProxyConfig;
use edge_cache_proxy::upstream::{Transport, TransportError, UpstreamRequest, UpstreamResponse};

pub const SECRET: &str = "test-secret";

/// A configuration with a secret set and both backends pointed at `base_url`.
pub fn test_config(base_url: &str) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.auth.secret = SECRET.to_string();
    config.backends.catalog.base_url = base_url.to_string();
    config.backends.avatar.base_url = base_url.to_string();
    config.observability.instance_id = "edge-test".to_string();
    config
}

/// An authorized GET request.
pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-app-key", SECRET)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn header<'a>(response: &'a Response, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// In-process transport with scripted responses.
///
/// Responses are served in order; once the script runs out, `fallback` is
/// returned. Every URL sent is recorded.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<UpstreamResponse, TransportError>>>,
    fallback: Result<UpstreamResponse, TransportError>,
    delay: Duration,
    calls: AtomicU32,
    urls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn ok(body: &'static str) -> Self {
        Self::with_fallback(Ok(response(200, body)))
    }

    pub fn with_fallback(fallback: Result<UpstreamResponse, TransportError>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            delay: Duration::ZERO,
            calls: AtomicU32::new(0),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn then(self, next: Result<UpstreamResponse, TransportError>) -> Self {
        self.script.lock().unwrap().push_back(next);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().unwrap().push(request.url.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn response(status: u16, body: &'static str) -> UpstreamResponse {
    UpstreamResponse {
        status,
        body: Bytes::from_static(body.as_bytes()),
    }
}

/// Handle to a running mock backend.
#[derive(Clone)]
pub struct MockBackend {
    pub addr: SocketAddr,
    calls: Arc<AtomicU32>,
    targets: Arc<Mutex<Vec<String>>>,
}

impl MockBackend {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Request targets (path and query) in arrival order.
    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }
}

/// Start a mock backend that always answers 200 with `body`.
pub async fn start_mock_backend(body: &'static str) -> MockBackend {
    start_programmable_backend(move |_target| async move { (200, body.to_string()) }).await
}

/// Start a programmable mock backend on an ephemeral port.
///
/// `f` receives the request target and returns the status and body.
pub async fn start_programmable_backend<F, Fut>(f: F) -> MockBackend
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let backend = MockBackend {
        addr: listener.local_addr().unwrap(),
        calls: Arc::new(AtomicU32::new(0)),
        targets: Arc::new(Mutex::new(Vec::new())),
    };
    let f = Arc::new(f);
    let state = backend.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let state = state.clone();
                    tokio::spawn(async move {
                        let Some(target) = read_target(&mut socket).await else {
                            return;
                        };
                        state.calls.fetch_add(1, Ordering::SeqCst);
                        state.targets.lock().unwrap().push(target.clone());

                        let (status, body) = f(target).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    backend
}

/// Read the request head and return its target, e.g. `/v1/users/1/avatar?a=1`.
async fn read_target(socket: &mut tokio::net::TcpStream) -> Option<String> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        head.extend_from_slice(&buf[..n]);
    }
    let head = String::from_utf8_lossy(&head);
    head.lines()
        .next()?
        .split_whitespace()
        .nth(1)
        .map(str::to_string)
}

/// An address nothing is listening on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}
