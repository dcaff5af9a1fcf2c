//! Resilient fetch orchestration.
//!
//! # Data Flow
//! ```text
//! fetch(url)
//!     → circuit check (open → reject, zero network I/O)
//!     → standard attempt (plain desktop profile, not logged)
//!     → on blocking status / transport failure:
//!         → cached profile for the origin, if any
//!         → catalog walk in escalation order, stop at first success
//!     → success: cache profile, heal circuit
//!     → exhaustion: record circuit failure, surface full history
//! ```
//!
//! # Design Decisions
//! - All per-origin state (cache, circuit, ledger) is owned here, keyed by
//!   the origin and sharded by dashmap; unrelated origins never contend
//! - Any success at all heals the circuit for that origin
//! - A failed cached attempt falls through to the walk instead of aborting
//! - Content-type validation happens after fetch accounting: a non-HTML
//!   response is a caller error, not a fetch failure

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde::Serialize;
use url::Url;

use crate::fetch::circuit::{
    CircuitSettings, CircuitSnapshot, CircuitStatus, OriginCircuitBreaker,
};
use crate::fetch::classify;
use crate::fetch::error::{AttemptFailure, FetchError};
use crate::fetch::ledger::AttemptLedger;
use crate::fetch::profile::{is_blocking_status, standard_profile, ProfileCatalog, RequestProfile};
use crate::fetch::transport::{Transport, TransportResponse};
use crate::fetch::tuning::TransportTuner;
use crate::observability::metrics;

/// A successfully fetched page.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub html: String,
    pub status: u16,
    pub content_type: String,
    /// True when the result came from the escalation path rather than the
    /// standard attempt.
    pub recovered: bool,
    pub strategy_used: Option<&'static str>,
}

/// Read-only per-origin stats.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryStats {
    pub has_cached_strategy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached_strategy_name: Option<&'static str>,
    pub attempt_history: Vec<String>,
    pub circuit_status: CircuitStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedStrategyEntry {
    pub origin: String,
    pub strategy: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OriginHistory {
    pub origin: String,
    pub attempts: Vec<String>,
}

/// Global snapshot for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoverySnapshot {
    pub total_origins: usize,
    pub successful_strategies: Vec<CachedStrategyEntry>,
    pub attempt_history: Vec<OriginHistory>,
    pub circuit_breakers: Vec<CircuitSnapshot>,
}

/// The hostname of the target, or the raw string when it does not parse.
/// Scopes caching and circuit-breaking.
pub fn origin_key(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

/// Obtains a usable response from an unreliable origin by escalating
/// through request profiles, remembering what worked per origin, and
/// refusing to hammer origins that are currently failing.
pub struct ResilientFetcher<T: Transport> {
    transport: T,
    catalog: ProfileCatalog,
    breaker: OriginCircuitBreaker,
    ledger: AttemptLedger,
    /// Most recently successful catalog index per origin. Never expires;
    /// a stale entry just fails once and falls through to the walk.
    cached: DashMap<String, usize>,
    tuner: Arc<TransportTuner>,
}

impl<T: Transport> ResilientFetcher<T> {
    pub fn new(
        transport: T,
        catalog: ProfileCatalog,
        settings: CircuitSettings,
        tuner: Arc<TransportTuner>,
    ) -> Self {
        Self {
            transport,
            catalog,
            breaker: OriginCircuitBreaker::new(settings),
            ledger: AttemptLedger::new(),
            cached: DashMap::new(),
            tuner,
        }
    }

    /// Apply new breaker thresholds (config hot reload).
    pub fn update_circuit_settings(&self, settings: CircuitSettings) {
        self.breaker.update_settings(settings);
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        let origin = origin_key(url);

        if self.breaker.is_open(&origin) {
            let failures = self.breaker.failures(&origin);
            tracing::warn!(origin = %origin, failures, "circuit open, rejecting fetch");
            metrics::record_circuit_rejection();
            return Err(FetchError::CircuitOpen { origin, failures });
        }

        let standard = standard_profile();
        match self.attempt(url, &standard).await {
            Ok(response) => {
                tracing::debug!(origin = %origin, status = response.status, "standard request succeeded");
                self.record_success(&origin);
                return self.finish(response, false, None);
            }
            Err(AttemptFailure::Status(status)) => {
                // Plain upstream error; caller-visible, no escalation and
                // no circuit accounting.
                tracing::debug!(origin = %origin, status, "upstream error status, not escalating");
                return Err(FetchError::UpstreamStatus { status });
            }
            Err(failure) => {
                tracing::info!(origin = %origin, error = %failure, "standard request failed, escalating");
                self.record_attempt_failure(&failure);
            }
        }

        self.recover(url, &origin).await
    }

    /// Walk the cached profile (if any) and then the catalog, in order.
    async fn recover(&self, url: &str, origin: &str) -> Result<FetchOutcome, FetchError> {
        // Copy the index out so no map guard is held across the awaits.
        let cached_index = self.cached.get(origin).map(|entry| *entry);
        if let Some(index) = cached_index {
            if let Some(profile) = self.catalog.get(index) {
                tracing::info!(origin = %origin, strategy = profile.name, "trying cached strategy");
                match self.attempt(url, profile).await {
                    Ok(response) => {
                        self.ledger
                            .append(origin, format!("✅ {} (cached)", profile.name));
                        self.record_success(origin);
                        metrics::record_strategy(profile.name, "success");
                        return self.finish(response, true, Some(profile.name));
                    }
                    Err(failure) => {
                        self.ledger.append(
                            origin,
                            format!("❌ {} (cached) - {}", profile.name, failure),
                        );
                        self.record_attempt_failure(&failure);
                        metrics::record_strategy(profile.name, "failure");
                        tracing::debug!(origin = %origin, error = %failure, "cached strategy failed, walking catalog");
                    }
                }
            }
        }

        let total = self.catalog.len();
        for (index, profile) in self.catalog.profiles().iter().enumerate() {
            tracing::debug!(
                origin = %origin,
                strategy = profile.name,
                attempt = index + 1,
                total,
                "trying fallback strategy"
            );
            match self.attempt(url, profile).await {
                Ok(response) => {
                    self.cached.insert(origin.to_string(), index);
                    self.ledger.append(
                        origin,
                        format!("✅ {} - status {}", profile.name, response.status),
                    );
                    self.record_success(origin);
                    metrics::record_strategy(profile.name, "success");
                    tracing::info!(origin = %origin, strategy = profile.name, "recovery succeeded");
                    return self.finish(response, true, Some(profile.name));
                }
                Err(failure) => {
                    self.ledger
                        .append(origin, format!("❌ {} - {}", profile.name, failure));
                    self.record_attempt_failure(&failure);
                    metrics::record_strategy(profile.name, "failure");
                }
            }
        }

        let failures = self.breaker.record_failure(origin);
        let attempts = self.ledger.history(origin);
        tracing::warn!(origin = %origin, failures, "all recovery strategies exhausted");
        metrics::record_exhaustion();
        Err(FetchError::AllStrategiesExhausted {
            origin: origin.to_string(),
            attempts,
        })
    }

    /// One transport attempt evaluated against the profile's rules.
    async fn attempt(
        &self,
        url: &str,
        profile: &RequestProfile,
    ) -> Result<TransportResponse, AttemptFailure> {
        if let Some(delay) = profile.pre_request_delay {
            tokio::time::sleep(delay).await;
        }

        let started = Instant::now();
        let response = self.transport.get(url, profile).await?;
        metrics::record_attempt_duration(profile.name, started.elapsed());

        let status = response.status;
        // Bytes arriving is not enough: a blocking status or a predicate
        // rejection still escalates.
        if is_blocking_status(status) || !profile.accepts(status) {
            return Err(AttemptFailure::Blocked(status));
        }
        if status >= 400 {
            return Err(AttemptFailure::Status(status));
        }
        Ok(response)
    }

    fn record_success(&self, origin: &str) {
        self.breaker.record_success(origin);
        self.tuner.observe_success();
    }

    fn record_attempt_failure(&self, failure: &AttemptFailure) {
        let diagnosis = classify::classify(&failure.to_string());
        self.tuner.observe_failure(diagnosis.category);
    }

    /// Content-type gate applied to every success path.
    fn finish(
        &self,
        response: TransportResponse,
        recovered: bool,
        strategy: Option<&'static str>,
    ) -> Result<FetchOutcome, FetchError> {
        let content_type = response.content_type.clone().unwrap_or_default();
        if !is_html(&content_type) {
            return Err(FetchError::InvalidContent {
                content_type,
                recovered,
            });
        }
        Ok(FetchOutcome {
            html: response.body,
            status: response.status,
            content_type,
            recovered,
            strategy_used: strategy,
        })
    }

    pub fn recovery_stats(&self, origin: &str) -> RecoveryStats {
        let cached_strategy_name = self
            .cached
            .get(origin)
            .and_then(|entry| self.catalog.get(*entry))
            .map(|profile| profile.name);
        RecoveryStats {
            has_cached_strategy: cached_strategy_name.is_some(),
            cached_strategy_name,
            attempt_history: self.ledger.history(origin),
            circuit_status: self.breaker.status(origin),
        }
    }

    pub fn snapshot(&self) -> RecoverySnapshot {
        let successful_strategies: Vec<_> = self
            .cached
            .iter()
            .filter_map(|entry| {
                self.catalog.get(*entry.value()).map(|profile| CachedStrategyEntry {
                    origin: entry.key().clone(),
                    strategy: profile.name,
                })
            })
            .collect();
        RecoverySnapshot {
            total_origins: successful_strategies.len(),
            successful_strategies,
            attempt_history: self
                .ledger
                .snapshot()
                .into_iter()
                .map(|(origin, attempts)| OriginHistory { origin, attempts })
                .collect(),
            circuit_breakers: self.breaker.snapshot(),
        }
    }
}

/// Content-type gate predicate: HTML or XHTML bodies pass, everything else
/// is a validation error. Mirrors the reference substring check over the
/// raw `Content-Type` header value.
fn is_html(content_type: &str) -> bool {
    content_type.contains("text/html") || content_type.contains("application/xhtml")
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NeverCalled;

    impl Transport for NeverCalled {
        fn get(
            &self,
            _url: &str,
            _profile: &RequestProfile,
        ) -> impl std::future::Future<
            Output = Result<TransportResponse, crate::fetch::transport::TransportError>,
        > + Send {
            async { panic!("transport must not be invoked") }
        }
    }

    #[test]
    fn origin_key_is_the_hostname() {
        assert_eq!(
            origin_key("https://example.test/some/page?q=1"),
            "example.test"
        );
    }

    #[test]
    fn origin_key_degrades_to_the_raw_string() {
        assert_eq!(origin_key("not a url at all"), "not a url at all");
    }

    #[tokio::test]
    async fn open_circuit_rejects_without_transport() {
        let fetcher = ResilientFetcher::new(
            NeverCalled,
            ProfileCatalog::standard(),
            CircuitSettings::default(),
            Arc::new(TransportTuner::new()),
        );
        for _ in 0..3 {
            fetcher.breaker.record_failure("example.test");
        }

        let err = fetcher.fetch("https://example.test/").await.unwrap_err();
        match err {
            FetchError::CircuitOpen { origin, failures } => {
                assert_eq!(origin, "example.test");
                assert_eq!(failures, 3);
            }
            other => panic!("expected CircuitOpen, got {other:?}"),
        }
    }
}
