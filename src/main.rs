//! Service Gateway
//!
//! Reverse proxy that fronts a changing set of backend services. Each path
//! prefix maps to a group of service instances; the table is replaced
//! whenever discovery (or the config file) changes.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────────┐
//!                         │                  SERVICE GATEWAY                  │
//!                         │                                                   │
//!     Client Request      │  ┌─────────┐    ┌──────────┐    ┌─────────────┐   │
//!     ────────────────────┼─▶│  http   │───▶│ gateway  │───▶│   mapping   │   │
//!                         │  │ server  │    │front door│    │    table    │   │
//!                         │  └─────────┘    └────┬─────┘    └──────┬──────┘   │
//!                         │                      │                 │          │
//!                         │                      ▼                 ▼          │
//!                         │                ┌──────────┐    ┌─────────────┐    │
//!                         │                │  stats   │    │load_balancer│    │
//!                         │                │ recorder │    │  selectors  │    │
//!                         │                └──────────┘    └──────┬──────┘    │
//!                         │                                       │           │
//!                         │                                       ▼           │
//!     Client Response     │  ┌─────────┐    ┌──────────┐    ┌─────────────┐   │
//!     ◀───────────────────┼──│  relay  │◀───│ policies │◀───│   proxy     │◀──┼── Backend
//!                         │  │(stream) │    │  chain   │    │   engine    │   │   Service
//!                         │  └─────────┘    └──────────┘    └─────────────┘   │
//!                         │                                                   │
//!                         │  ┌─────────────────────────────────────────────┐  │
//!                         │  │ config + watcher │ observability │ admin    │  │
//!                         │  └─────────────────────────────────────────────┘  │
//!                         └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use service_gateway::config::loader::load_config;
use service_gateway::config::watcher::ConfigWatcher;
use service_gateway::lifecycle::{signals::spawn_signal_handler, Shutdown};
use service_gateway::observability::{logging, metrics};
use service_gateway::{GatewayConfig, HttpServer};

#[derive(Parser)]
#[command(name = "service-gateway")]
#[command(about = "Discovery-driven HTTP gateway", long_about = None)]
struct Args {
    /// TOML configuration file. Watched for mapping changes.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "service-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address(),
        mappings = config.mappings.len(),
        request_timeout_secs = config.timeouts.request_secs,
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

    // Without a config file nothing ever sends updates; the sender is kept
    // alive so the update task simply idles.
    let (_watcher, _idle_tx, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(watcher.run()?), None, rx)
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (None, Some(tx), rx)
        }
    };

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_handler(&shutdown);

    let server = HttpServer::new(config);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
