//! fetch-proxy
//!
//! An HTTP service that fetches remote web pages on behalf of callers.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │                 FETCH PROXY                   │
//!                    │                                               │
//!   POST /fetch-url  │  ┌────────┐   ┌──────────┐   ┌────────────┐  │
//!   ─────────────────┼─▶│  http  │──▶│ handlers │──▶│  resilient │  │
//!                    │  │ server │   │          │   │  fetcher   │  │
//!                    │  └────────┘   └──────────┘   └─────┬──────┘  │
//!                    │                                    │         │
//!                    │              ┌─────────────────────┼──────┐  │
//!                    │              │  profile catalog    ▼      │  │
//!   page markup      │              │  circuit breaker  ┌─────┐  │  │      Remote
//!   ◀────────────────┼──────────────│  attempt ledger   │trans│──┼──┼───▶  origin
//!                    │              │  transport tuning │port │  │  │
//!                    │              └───────────────────┴─────┴──┘  │
//!                    │                                               │
//!                    │  config (toml + hot reload) · tracing ·       │
//!                    │  metrics · graceful shutdown                  │
//!                    └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use fetch_proxy::config::watcher::ConfigWatcher;
use fetch_proxy::config::{load_config, FetchConfig};
use fetch_proxy::observability::{logging, metrics};
use fetch_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "fetch-proxy")]
#[command(about = "Resilient page-fetch service", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when absent.
    #[arg(short, long, default_value = "fetch-proxy.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = if args.config.exists() {
        load_config(&args.config)?
    } else {
        FetchConfig::default()
    };

    logging::init_logging(&config.observability.log_level);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        circuit_failure_threshold = config.circuit_breaker.failure_threshold,
        circuit_cooldown_secs = config.circuit_breaker.cooldown_secs,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "listening for connections");

    // Hot reload only runs when a config file actually exists; the watcher
    // handle must stay alive for callbacks to fire.
    let (watcher, config_updates) = ConfigWatcher::new(&args.config);
    let _watcher_handle = if args.config.exists() {
        watcher.run().ok()
    } else {
        None
    };

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.trigger();
        }
    });

    let server = HttpServer::new(config);
    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
