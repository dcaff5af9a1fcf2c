//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, overall timeout, request ID, CORS, limits)
//! - Bind the server to a listener and serve until shutdown
//! - Apply hot-reloaded configuration to the running fetcher
//!
//! The overall request timeout here is the budget for a full escalation
//! walk; individual attempts are bounded by their profile timeouts.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::schema::{FetchConfig, GenerationConfig};
use crate::fetch::circuit::CircuitSettings;
use crate::fetch::fetcher::ResilientFetcher;
use crate::fetch::profile::ProfileCatalog;
use crate::fetch::transport::ReqwestTransport;
use crate::fetch::tuning::TransportTuner;
use crate::http::handlers;
use crate::http::request::RequestIdLayer;

/// Service-lifetime totals reported by `/health`.
#[derive(Debug, Default)]
pub struct ServiceCounters {
    pub fetches: AtomicU64,
    pub recoveries: AtomicU64,
    pub exhaustions: AtomicU64,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub fetcher: Arc<ResilientFetcher<ReqwestTransport>>,
    pub generation: GenerationConfig,
    /// Plain client for the pass-through endpoints; no escalation involved.
    pub passthrough: reqwest::Client,
    pub started_at: Instant,
    pub counters: Arc<ServiceCounters>,
}

/// HTTP server for the fetch service.
pub struct HttpServer {
    router: Router,
    config: FetchConfig,
    fetcher: Arc<ResilientFetcher<ReqwestTransport>>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: FetchConfig) -> Self {
        let tuner = Arc::new(TransportTuner::new());
        let transport = ReqwestTransport::new(
            Duration::from_secs(config.timeouts.connect_secs),
            tuner.clone(),
        );
        let fetcher = Arc::new(ResilientFetcher::new(
            transport,
            ProfileCatalog::standard(),
            CircuitSettings::from(&config.circuit_breaker),
            tuner,
        ));

        let state = AppState {
            fetcher: fetcher.clone(),
            generation: config.generation.clone(),
            passthrough: reqwest::Client::new(),
            started_at: Instant::now(),
            counters: Arc::new(ServiceCounters::default()),
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            fetcher,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &FetchConfig, state: AppState) -> Router {
        Router::new()
            .route("/fetch-url", post(handlers::fetch_url))
            .route("/recovery-stats", get(handlers::recovery_snapshot))
            .route("/recovery-stats/{origin}", get(handlers::origin_stats))
            .route("/health", get(handlers::health))
            .route("/api/generate", post(handlers::generate))
            .route("/proxy", get(handlers::proxy_resource))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(RequestIdLayer)
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until the shutdown signal fires, applying config
    /// updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<FetchConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        // Only the breaker thresholds apply hot; listener and timeout
        // changes need a restart.
        let fetcher = self.fetcher.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                tracing::info!(
                    failure_threshold = new_config.circuit_breaker.failure_threshold,
                    cooldown_secs = new_config.circuit_breaker.cooldown_secs,
                    "applying updated circuit breaker settings"
                );
                fetcher.update_circuit_settings(CircuitSettings::from(&new_config.circuit_breaker));
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}
