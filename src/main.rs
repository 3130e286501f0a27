//! Edge Gateway
//!
//! An edge request-dispatch engine built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────────┐
//!                        │                    EDGE GATEWAY                       │
//!                        │                                                       │
//!     Client Request     │  ┌─────────┐    ┌──────────────┐    ┌──────────────┐  │
//!     ───────────────────┼─▶│  http   │───▶│   routing    │───▶│    filter    │  │
//!                        │  │ server  │    │ first match  │    │    chain     │  │
//!                        │  └─────────┘    └──────────────┘    └──────┬───────┘  │
//!                        │                                            │          │
//!     Client Response    │  ┌─────────┐    ┌──────────────┐           ▼          │
//!     ◀──────────────────┼──│response │◀───│ response     │◀───┌──────────────┐  │
//!                        │  │ mapping │    │ phase filters│    │   forward    │◀─┼── Backend
//!                        │  └─────────┘    └──────────────┘    └──────────────┘  │
//!                        │                                                       │
//!                        │  config + reload │ admin API │ observability │ lifecycle
//!                        └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use edge_gateway::config::{load_config, ConfigWatcher, GatewayConfig};
use edge_gateway::lifecycle::{spawn_signal_handler, Gateway, Shutdown};
use edge_gateway::observability::{logging, metrics};
use edge_gateway::routing::FileRouteSource;

#[derive(Parser)]
#[command(name = "edge-gateway")]
#[command(about = "Edge request-dispatch gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,

    /// Validate the configuration and routes, then exit.
    #[arg(long)]
    check: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "edge-gateway starting");

    let mut runtime = tokio::runtime::Builder::new_multi_thread();
    runtime.enable_all();
    if let Some(threads) = config.runtime.worker_threads {
        runtime.worker_threads(threads);
    }
    runtime.build()?.block_on(run(args, config))
}

async fn run(args: Args, config: GatewayConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        global_filters = config.gateway.global_filters.len(),
        "Configuration loaded"
    );

    let gateway = Gateway::builder(config.clone())
        .route_source(Arc::new(FileRouteSource::new(&args.config)))
        .build()?;

    if args.check {
        println!(
            "Configuration OK: {} route(s)",
            gateway.locator().snapshot().len()
        );
        return Ok(());
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let (watcher, reloads) = ConfigWatcher::new(&args.config);
    let _signals = spawn_signal_handler(shutdown.clone(), watcher.sender());
    // Keep the watcher alive for the lifetime of the server.
    let _watcher = match watcher.run() {
        Ok(w) => Some(w),
        Err(e) => {
            tracing::warn!(error = %e, "Config watcher unavailable, reload only via SIGHUP");
            None
        }
    };

    gateway.run(listener, reloads, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
