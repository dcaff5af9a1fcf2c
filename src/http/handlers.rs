//! Route handlers.
//!
//! Thin layer over the fetch subsystem: deserialize, delegate, map typed
//! errors to status codes and JSON bodies. No fetch policy lives here.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::fetch::classify::{self, Category};
use crate::fetch::error::FetchError;
use crate::fetch::fetcher::{origin_key, RecoveryStats, RecoverySnapshot};
use crate::fetch::profile::DESKTOP_USER_AGENT;
use crate::http::response::{FetchFailure, FetchSuccess, HealthReport};
use crate::http::server::AppState;
use crate::observability::metrics;

#[derive(Debug, Deserialize)]
pub struct FetchRequest {
    pub url: Option<String>,
}

/// Main endpoint: fetch a page on the caller's behalf.
pub async fn fetch_url(
    State(state): State<AppState>,
    Json(request): Json<FetchRequest>,
) -> Response {
    let started = Instant::now();
    let Some(url) = request.url.filter(|u| !u.trim().is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "URL is required" })),
        )
            .into_response();
    };

    tracing::info!(url = %url, "fetch requested");
    match state.fetcher.fetch(&url).await {
        Ok(outcome) => {
            state.counters.fetches.fetch_add(1, Ordering::Relaxed);
            if outcome.recovered {
                state.counters.recoveries.fetch_add(1, Ordering::Relaxed);
            }
            metrics::record_fetch("success", outcome.recovered);

            let recovery_stats = outcome
                .recovered
                .then(|| state.fetcher.recovery_stats(&origin_key(&url)));
            let message = match outcome.strategy_used {
                Some(strategy) => {
                    format!("✨ Auto-recovery successful! Used \"{strategy}\" strategy.")
                }
                None => "Website fetched successfully!".to_string(),
            };
            let response_time_ms = started.elapsed().as_millis() as u64;
            tracing::info!(
                url = %url,
                status = outcome.status,
                recovered = outcome.recovered,
                response_time_ms,
                "fetch complete"
            );
            Json(FetchSuccess {
                html: outcome.html,
                status: outcome.status,
                content_type: outcome.content_type,
                response_time_ms,
                recovered: outcome.recovered,
                strategy_used: outcome.strategy_used,
                message,
                recovery_stats,
            })
            .into_response()
        }
        Err(err) => {
            metrics::record_fetch(err.kind(), false);
            fetch_error_response(&state, err, started)
        }
    }
}

fn fetch_error_response(state: &AppState, err: FetchError, started: Instant) -> Response {
    let response_time_ms = started.elapsed().as_millis() as u64;
    match err {
        FetchError::UpstreamStatus { status } => {
            let body = FetchFailure {
                error: format!("Website returned status {status}"),
                suggestion: "The website may be down or the URL may be incorrect.".into(),
                details: None,
                response_time_ms,
                recovery_attempted: false,
                kind: "upstream_status",
                origin_history: None,
                diagnosis: None,
                recovery_stats: None,
            };
            let code = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            (code, Json(body)).into_response()
        }
        FetchError::InvalidContent {
            content_type,
            recovered,
        } => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "URL does not return HTML content",
                "contentType": content_type,
                "suggestion": "Make sure the URL points to a webpage, not a file or API endpoint.",
                "recoveryAttempted": recovered,
                "responseTimeMs": response_time_ms,
                "kind": "invalid_content",
            })),
        )
            .into_response(),
        FetchError::CircuitOpen {
            ref origin,
            failures,
        } => {
            let body = FetchFailure {
                error: format!("Too many recent failures for {origin}"),
                suggestion: "Wait a few minutes before retrying this site.".into(),
                details: Some(format!("{failures} consecutive failed recovery walks")),
                response_time_ms,
                recovery_attempted: false,
                kind: "circuit_open",
                origin_history: Some(state.fetcher.recovery_stats(origin).attempt_history),
                diagnosis: None,
                recovery_stats: None,
            };
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
        FetchError::AllStrategiesExhausted {
            ref origin,
            ref attempts,
        } => {
            state.counters.exhaustions.fetch_add(1, Ordering::Relaxed);
            let diagnosis = classify::classify(&attempts.join(", "));
            // Blocking is the expected failure mode here; transport-level
            // categories produce their more precise message instead.
            let (error, suggestion) = match diagnosis.category {
                Category::Blocked | Category::Unknown => (
                    "All recovery strategies failed",
                    "This website has very strong anti-bot protection. \
                     Try a different website or wait before retrying.",
                ),
                _ => diagnosis.user_message(),
            };
            let body = FetchFailure {
                error: error.into(),
                suggestion: suggestion.into(),
                details: Some(err.to_string()),
                response_time_ms,
                recovery_attempted: true,
                kind: "all_strategies_exhausted",
                origin_history: Some(attempts.clone()),
                diagnosis: Some(diagnosis),
                recovery_stats: Some(state.fetcher.recovery_stats(origin)),
            };
            (StatusCode::BAD_GATEWAY, Json(body)).into_response()
        }
    }
}

/// Global recovery snapshot: cached strategies, histories, breaker states.
pub async fn recovery_snapshot(State(state): State<AppState>) -> Json<RecoverySnapshot> {
    Json(state.fetcher.snapshot())
}

/// Per-origin recovery stats.
pub async fn origin_stats(
    State(state): State<AppState>,
    Path(origin): Path<String>,
) -> Json<RecoveryStats> {
    Json(state.fetcher.recovery_stats(&origin))
}

/// Liveness and rough service totals.
pub async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport {
        uptime_secs: state.started_at.elapsed().as_secs(),
        fetches: state.counters.fetches.load(Ordering::Relaxed),
        recoveries: state.counters.recoveries.load(Ordering::Relaxed),
        exhaustions: state.counters.exhaustions.load(Ordering::Relaxed),
    })
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: Option<String>,
}

/// Opaque pass-through to the configured generative-text upstream. The API
/// key stays server-side; the body is forwarded untouched.
pub async fn generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    if !state.generation.enabled || state.generation.api_key.is_empty() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "error": "Generation API not configured",
                "message": "Set [generation] endpoint and api_key in the config file",
            })),
        )
            .into_response();
    }
    let Some(prompt) = request.prompt.filter(|p| !p.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Prompt is required" })),
        )
            .into_response();
    };

    let result = state
        .passthrough
        .post(&state.generation.endpoint)
        .bearer_auth(&state.generation.api_key)
        .timeout(Duration::from_secs(state.generation.timeout_secs))
        .json(&json!({ "prompt": prompt }))
        .send()
        .await;

    match result {
        Ok(upstream) => {
            let code = StatusCode::from_u16(upstream.status().as_u16())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            let body: Value = upstream.json().await.unwrap_or_else(|_| json!({}));
            (code, Json(body)).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "generation upstream unreachable");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({
                    "error": "Generation upstream unreachable",
                    "details": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProxyParams {
    pub url: Option<String>,
}

/// Byte pass-through for page subresources (images, stylesheets), so the
/// front end can render fetched markup without mixed-origin problems.
pub async fn proxy_resource(
    State(state): State<AppState>,
    Query(params): Query<ProxyParams>,
) -> Response {
    let Some(url) = params.url.filter(|u| !u.is_empty()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "URL parameter is required" })),
        )
            .into_response();
    };

    let result = state
        .passthrough
        .get(&url)
        .header(header::USER_AGENT, DESKTOP_USER_AGENT)
        .timeout(Duration::from_secs(15))
        .send()
        .await;

    match result {
        Ok(upstream) => {
            let content_type = upstream
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("application/octet-stream")
                .to_string();
            match upstream.bytes().await {
                Ok(bytes) => Response::builder()
                    .header(header::CONTENT_TYPE, content_type)
                    .header(header::CACHE_CONTROL, "public, max-age=86400")
                    .body(Body::from(bytes))
                    .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response()),
                Err(e) => proxy_failure(&e),
            }
        }
        Err(e) => proxy_failure(&e),
    }
}

fn proxy_failure(e: &reqwest::Error) -> Response {
    tracing::error!(error = %e, "resource proxy failed");
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({ "error": "Failed to proxy resource" })),
    )
        .into_response()
}
