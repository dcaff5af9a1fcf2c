//! Recovery-loop properties, driven by a scripted transport stub.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use fetch_proxy::fetch::circuit::{CircuitSettings, CircuitStatus};
use fetch_proxy::fetch::error::FetchError;
use fetch_proxy::fetch::fetcher::ResilientFetcher;
use fetch_proxy::fetch::profile::{ProfileCatalog, RequestProfile};
use fetch_proxy::fetch::transport::{Transport, TransportError, TransportResponse};
use fetch_proxy::fetch::tuning::TransportTuner;

/// Transport stub: delegates to a closure and counts invocations.
struct StubTransport<F> {
    decide: F,
    calls: Arc<AtomicU32>,
}

impl<F> Transport for StubTransport<F>
where
    F: Fn(&RequestProfile) -> Result<TransportResponse, TransportError> + Send + Sync,
{
    fn get(
        &self,
        _url: &str,
        profile: &RequestProfile,
    ) -> impl std::future::Future<Output = Result<TransportResponse, TransportError>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let result = (self.decide)(profile);
        async move { result }
    }
}

fn html(status: u16) -> TransportResponse {
    TransportResponse {
        status,
        content_type: Some("text/html; charset=utf-8".to_string()),
        body: "<html><body>ok</body></html>".to_string(),
    }
}

fn build_fetcher<F>(decide: F) -> (ResilientFetcher<StubTransport<F>>, Arc<AtomicU32>)
where
    F: Fn(&RequestProfile) -> Result<TransportResponse, TransportError> + Send + Sync,
{
    let calls = Arc::new(AtomicU32::new(0));
    let transport = StubTransport {
        decide,
        calls: calls.clone(),
    };
    let fetcher = ResilientFetcher::new(
        transport,
        ProfileCatalog::standard(),
        CircuitSettings::default(),
        Arc::new(TransportTuner::new()),
    );
    (fetcher, calls)
}

#[tokio::test]
async fn standard_success_is_not_recovered() {
    let (fetcher, calls) = build_fetcher(|_| Ok(html(200)));

    let outcome = fetcher.fetch("https://ok.test/page").await.unwrap();
    assert!(!outcome.recovered);
    assert!(outcome.strategy_used.is_none());
    assert_eq!(outcome.status, 200);
    // One standard attempt; the catalog is never consulted.
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(fetcher.recovery_stats("ok.test").attempt_history.is_empty());
}

#[tokio::test(start_paused = true)]
async fn hard_block_heals_via_delayed_request_then_cache() {
    let (fetcher, calls) = build_fetcher(|profile| {
        if profile.name == "Delayed Request" {
            Ok(html(200))
        } else {
            Ok(html(999))
        }
    });

    let outcome = fetcher.fetch("https://blocked.test/").await.unwrap();
    assert!(outcome.recovered);
    assert_eq!(outcome.strategy_used, Some("Delayed Request"));

    let history = fetcher.recovery_stats("blocked.test").attempt_history;
    assert_eq!(history.len(), 5);
    assert!(history[..4].iter().all(|entry| entry.starts_with("❌")));
    assert!(history[4].starts_with("✅ Delayed Request - status 200"));
    // Standard attempt plus the full catalog.
    assert_eq!(calls.load(Ordering::SeqCst), 6);

    // The next fetch tries the cached profile right after the standard
    // attempt; profiles 1-4 are skipped entirely.
    let outcome = fetcher.fetch("https://blocked.test/").await.unwrap();
    assert!(outcome.recovered);
    assert_eq!(outcome.strategy_used, Some("Delayed Request"));
    assert_eq!(calls.load(Ordering::SeqCst), 8);

    let history = fetcher.recovery_stats("blocked.test").attempt_history;
    assert_eq!(history.len(), 6);
    assert!(history[5].contains("(cached)"));
}

#[tokio::test]
async fn cold_origin_failures_recorded_in_catalog_order() {
    let (fetcher, _) = build_fetcher(|profile| {
        if profile.name == "Minimal Headers" {
            Ok(html(200))
        } else {
            Err(TransportError::Connect("connection refused: origin".into()))
        }
    });

    let outcome = fetcher.fetch("https://cold.test/").await.unwrap();
    assert!(outcome.recovered);
    assert_eq!(outcome.strategy_used, Some("Minimal Headers"));

    let history = fetcher.recovery_stats("cold.test").attempt_history;
    assert_eq!(history.len(), 3);
    assert!(history[0].starts_with("❌ Modern Browser"));
    assert!(history[1].starts_with("❌ Mobile Browser"));
    assert!(history[2].starts_with("✅ Minimal Headers - status 200"));
}

#[tokio::test(start_paused = true)]
async fn exhaustion_reports_every_catalog_attempt() {
    let (fetcher, _) =
        build_fetcher(|_| Err(TransportError::TimedOut(Duration::from_secs(25))));

    let err = fetcher.fetch("https://dead.test/").await.unwrap_err();
    match err {
        FetchError::AllStrategiesExhausted { origin, attempts } => {
            assert_eq!(origin, "dead.test");
            assert_eq!(attempts.len(), 5);
            assert!(attempts.iter().all(|entry| entry.starts_with("❌")));
        }
        other => panic!("expected AllStrategiesExhausted, got {other:?}"),
    }
    // One failed walk is not enough to trip the breaker.
    assert_eq!(
        fetcher.recovery_stats("dead.test").circuit_status,
        CircuitStatus::Closed
    );
}

#[tokio::test(start_paused = true)]
async fn exhaustion_includes_the_cached_attempt() {
    let healthy = Arc::new(AtomicBool::new(true));
    let flag = healthy.clone();
    let (fetcher, _) = build_fetcher(move |profile| {
        if flag.load(Ordering::SeqCst) {
            if profile.name == "Search Crawler" {
                Ok(html(200))
            } else {
                Ok(html(999))
            }
        } else {
            Err(TransportError::Connect("connection refused".into()))
        }
    });

    // First walk caches "Search Crawler" (3 failures + 1 success logged).
    fetcher.fetch("https://flaky.test/").await.unwrap();
    healthy.store(false, Ordering::SeqCst);

    let err = fetcher.fetch("https://flaky.test/").await.unwrap_err();
    let FetchError::AllStrategiesExhausted { attempts, .. } = err else {
        panic!("expected AllStrategiesExhausted");
    };
    // Prior history (4) + failed cached attempt + 5 catalog failures.
    assert_eq!(attempts.len(), 10);
    assert!(attempts[4].starts_with("❌ Search Crawler (cached)"));
}

#[tokio::test(start_paused = true)]
async fn circuit_opens_after_three_exhausted_walks() {
    let (fetcher, calls) =
        build_fetcher(|_| Err(TransportError::Connect("connection refused".into())));

    for _ in 0..3 {
        let err = fetcher.fetch("https://down.test/").await.unwrap_err();
        assert!(matches!(err, FetchError::AllStrategiesExhausted { .. }));
    }

    let before = calls.load(Ordering::SeqCst);
    let err = fetcher.fetch("https://down.test/").await.unwrap_err();
    match err {
        FetchError::CircuitOpen { origin, failures } => {
            assert_eq!(origin, "down.test");
            assert_eq!(failures, 3);
        }
        other => panic!("expected CircuitOpen, got {other:?}"),
    }
    // Rejected without any network attempt.
    assert_eq!(calls.load(Ordering::SeqCst), before);
    assert_eq!(
        fetcher.recovery_stats("down.test").circuit_status,
        CircuitStatus::Open
    );
}

#[tokio::test(start_paused = true)]
async fn any_success_heals_the_circuit() {
    let healthy = Arc::new(AtomicBool::new(false));
    let flag = healthy.clone();
    let (fetcher, _) = build_fetcher(move |_| {
        if flag.load(Ordering::SeqCst) {
            Ok(html(200))
        } else {
            Err(TransportError::Connect("connection refused".into()))
        }
    });

    for _ in 0..2 {
        fetcher.fetch("https://wobbly.test/").await.unwrap_err();
    }

    healthy.store(true, Ordering::SeqCst);
    let outcome = fetcher.fetch("https://wobbly.test/").await.unwrap();
    assert!(!outcome.recovered);

    // The failure count restarted from zero: two more walks stay closed,
    // the third trips the breaker again.
    healthy.store(false, Ordering::SeqCst);
    for _ in 0..2 {
        fetcher.fetch("https://wobbly.test/").await.unwrap_err();
    }
    assert_eq!(
        fetcher.recovery_stats("wobbly.test").circuit_status,
        CircuitStatus::Closed
    );
    fetcher.fetch("https://wobbly.test/").await.unwrap_err();
    assert_eq!(
        fetcher.recovery_stats("wobbly.test").circuit_status,
        CircuitStatus::Open
    );
}

#[tokio::test(start_paused = true)]
async fn cooldown_expiry_lets_fetches_through_again() {
    let (fetcher, _) =
        build_fetcher(|_| Err(TransportError::Connect("connection refused".into())));

    for _ in 0..3 {
        fetcher.fetch("https://cooling.test/").await.unwrap_err();
    }
    assert!(matches!(
        fetcher.fetch("https://cooling.test/").await.unwrap_err(),
        FetchError::CircuitOpen { .. }
    ));

    tokio::time::advance(Duration::from_secs(301)).await;

    // The entry was discarded; the transport is attempted again.
    assert!(matches!(
        fetcher.fetch("https://cooling.test/").await.unwrap_err(),
        FetchError::AllStrategiesExhausted { .. }
    ));
}

#[tokio::test]
async fn plain_error_status_is_not_escalated() {
    let (fetcher, calls) = build_fetcher(|_| Ok(html(404)));

    let err = fetcher.fetch("https://missing.test/").await.unwrap_err();
    assert!(matches!(err, FetchError::UpstreamStatus { status: 404 }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stats = fetcher.recovery_stats("missing.test");
    assert!(stats.attempt_history.is_empty());
    assert_eq!(stats.circuit_status, CircuitStatus::Closed);
}

#[tokio::test]
async fn non_html_response_is_a_validation_error() {
    let (fetcher, _) = build_fetcher(|_| {
        Ok(TransportResponse {
            status: 200,
            content_type: Some("application/json".to_string()),
            body: "{}".to_string(),
        })
    });

    let err = fetcher.fetch("https://api.test/").await.unwrap_err();
    match err {
        FetchError::InvalidContent {
            content_type,
            recovered,
        } => {
            assert_eq!(content_type, "application/json");
            assert!(!recovered);
        }
        other => panic!("expected InvalidContent, got {other:?}"),
    }

    // No circuit or cache accounting for validation errors.
    let stats = fetcher.recovery_stats("api.test");
    assert!(!stats.has_cached_strategy);
    assert_eq!(stats.circuit_status, CircuitStatus::Closed);
}
