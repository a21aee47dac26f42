//! Edge Cache Proxy
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────────┐
//!                          │                  EDGE CACHE PROXY                     │
//!                          │                                                       │
//!   Client Request         │  ┌──────────┐   ┌─────────┐   ┌──────────────────┐   │
//!   ───────────────────────┼─▶│ security │──▶│ routing │──▶│ canonical key +  │   │
//!                          │  │ auth gate│   │ matcher │   │ cache policy     │   │
//!                          │  └──────────┘   └─────────┘   └────────┬─────────┘   │
//!                          │                                        ▼              │
//!                          │                              ┌──────────────────┐     │
//!                          │                              │ inflight         │     │
//!                          │                              │ coalescer        │     │
//!                          │                              └────────┬─────────┘     │
//!                          │                                       ▼               │
//!   Client Response        │  ┌──────────┐                ┌──────────────────┐     │
//!   ◀──────────────────────┼──│ response │◀───────────────│ upstream fetcher │◀────┼── Upstream
//!                          │  │ composer │                │ (bounded retry)  │     │   JSON API
//!                          │  └──────────┘                └──────────────────┘     │
//!                          └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use edge_cache_proxy::config::{load_config, load_from_env, watcher::ConfigWatcher};
use edge_cache_proxy::lifecycle::{signals::shutdown_on_signal, Shutdown};
use edge_cache_proxy::observability::{logging::init_logging, metrics};
use edge_cache_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "edge-cache-proxy")]
#[command(about = "Caching and coalescing reverse proxy for read-only JSON APIs", long_about = None)]
struct Cli {
    /// TOML config file. Without it, defaults plus EDGE_PROXY_* variables are used.
    #[arg(short, long, env = "EDGE_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Reload the config file when it changes.
    #[arg(long)]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    };

    init_logging(&config.observability);
    tracing::info!("edge-cache-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        catalog = %config.backends.catalog.base_url,
        avatar = %config.backends.avatar.base_url,
        max_retries = config.retries.max_retries,
        instance_id = %config.observability.instance_id,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher must stay alive for the lifetime of the server.
    let (_watcher, config_updates) = match (&cli.config, cli.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => (None, mpsc::unbounded_channel().1),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let server = HttpServer::new(config)?;
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
