//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Compile configuration into a serving snapshot
//! - Swap the snapshot on config reload, keeping settings that need a restart
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::cache::{InflightCoalescer, PolicySelector};
use crate::config::loader::join_errors;
use crate::config::validation::{validate_config, ValidationError};
use crate::config::ProxyConfig;
use crate::http::handler::proxy_handler;
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::http::response::ResponseComposer;
use crate::resilience::RetryPolicy;
use crate::routing::Router as ProxyRouter;
use crate::security::AuthGate;
use crate::upstream::{FetchResult, HttpTransport, Transport, UpstreamFetcher};

/// Errors raised while building the server from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("invalid backend URL: {0}")]
    BackendUrl(#[from] url::ParseError),

    #[error("invalid auth header name: {0}")]
    AuthHeader(#[from] axum::http::header::InvalidHeaderName),

    #[error("invalid instance id: {0}")]
    InstanceId(#[from] axum::http::header::InvalidHeaderValue),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid configuration: {}", join_errors(.0))]
    Config(Vec<ValidationError>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Everything derived from one configuration version.
///
/// Immutable; replaced as a whole on reload.
pub struct ServingState {
    pub config: ProxyConfig,
    pub router: ProxyRouter,
    pub policies: PolicySelector,
    pub auth: AuthGate,
    pub composer: ResponseComposer,
    pub fetcher: UpstreamFetcher,
}

impl ServingState {
    pub fn build(config: ProxyConfig, transport: Arc<dyn Transport>) -> Result<Self, ServerError> {
        validate_config(&config).map_err(ServerError::Config)?;
        let router = ProxyRouter::from_config(&config)?;
        let composer = ResponseComposer::new(&config.observability.instance_id, router.supported_routes())?;
        Ok(Self {
            policies: PolicySelector::new(&config.cache),
            auth: AuthGate::new(&config.auth)?,
            fetcher: UpstreamFetcher::new(transport, RetryPolicy::new(&config.retries)),
            router,
            composer,
            config,
        })
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    serving: Arc<ArcSwap<ServingState>>,
    transport: Arc<dyn Transport>,
    /// Shared by every snapshot; survives config reloads.
    pub coalescer: Arc<InflightCoalescer<FetchResult>>,
}

impl AppState {
    pub fn new(config: ProxyConfig, transport: Arc<dyn Transport>) -> Result<Self, ServerError> {
        let serving = ServingState::build(config, transport.clone())?;
        Ok(Self {
            serving: Arc::new(ArcSwap::from_pointee(serving)),
            transport,
            coalescer: Arc::new(InflightCoalescer::new()),
        })
    }

    /// Current serving snapshot.
    pub fn serving(&self) -> Arc<ServingState> {
        self.serving.load_full()
    }

    /// Replace the serving snapshot. In-flight requests finish on the old one.
    ///
    /// The listener, timeouts and observability outputs are fixed at startup;
    /// changes to them are logged and the running values are kept.
    pub fn reload(&self, mut config: ProxyConfig) -> Result<(), ServerError> {
        let running = self.serving();
        for section in restart_only_changes(&running.config, &config) {
            tracing::warn!(section, "Change requires a restart, keeping running value");
        }
        config.listener = running.config.listener.clone();
        config.timeouts = running.config.timeouts.clone();
        config.observability.log_level = running.config.observability.log_level.clone();
        config.observability.log_format = running.config.observability.log_format;
        config.observability.metrics_enabled = running.config.observability.metrics_enabled;
        config.observability.metrics_address = running.config.observability.metrics_address.clone();

        let next = ServingState::build(config, self.transport.clone())?;
        self.serving.store(Arc::new(next));
        Ok(())
    }
}

/// Sections that differ between `running` and `next` but only take effect on restart.
fn restart_only_changes(running: &ProxyConfig, next: &ProxyConfig) -> Vec<&'static str> {
    let mut sections = Vec::new();
    if running.listener.bind_address != next.listener.bind_address {
        sections.push("listener.bind_address");
    }
    if running.timeouts.request_secs != next.timeouts.request_secs {
        sections.push("timeouts.request_secs");
    }
    if running.timeouts.upstream_secs != next.timeouts.upstream_secs {
        sections.push("timeouts.upstream_secs");
    }
    let (a, b) = (&running.observability, &next.observability);
    if a.log_level != b.log_level || a.log_format != b.log_format {
        sections.push("observability.log");
    }
    if a.metrics_enabled != b.metrics_enabled || a.metrics_address != b.metrics_address {
        sections.push("observability.metrics");
    }
    sections
}

/// HTTP server for the edge cache proxy.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a server that reaches upstreams over HTTP(S).
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let transport = Arc::new(HttpTransport::new(&config.timeouts)?);
        Self::with_transport(config, transport)
    }

    /// Create a server with a custom upstream transport.
    pub fn with_transport(config: ProxyConfig, transport: Arc<dyn Transport>) -> Result<Self, ServerError> {
        let request_timeout = Duration::from_secs(config.timeouts.request_secs);
        let state = AppState::new(config, transport)?;
        let router = Self::build_router(request_timeout, state.clone());
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(request_timeout: Duration, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(TraceLayer::new_for_http())
            .layer(propagate_request_id_layer())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let reload_state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match reload_state.reload(config) {
                    Ok(()) => tracing::info!("Configuration reloaded"),
                    Err(e) => tracing::error!(error = %e, "Rejected reloaded configuration"),
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
