//! Per-origin circuit breaker.
//!
//! # States
//! - Closed: fetches pass through (the default; no entry exists)
//! - Open: fetches rejected without network I/O
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure count reaches the threshold
//! Open → Closed: any success deletes the entry, or the cooldown window
//!                elapses and the entry is discarded on the next check
//! ```
//!
//! # Design Decisions
//! - Per-origin breaker, not global; unrelated origins never contend
//! - No half-open probing: recovery is all-or-nothing after cooldown
//! - Expiry discards the entry entirely instead of decrementing counters
//! - Thresholds are configuration and hot-swappable via arc-swap

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::schema::CircuitBreakerConfig;

/// Breaker tuning knobs. Defaults: trip after 3 consecutive failures, hold
/// for 5 minutes.
#[derive(Debug, Clone, Copy)]
pub struct CircuitSettings {
    pub failure_threshold: u32,
    pub cooldown: Duration,
}

impl Default for CircuitSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(300),
        }
    }
}

impl From<&CircuitBreakerConfig> for CircuitSettings {
    fn from(config: &CircuitBreakerConfig) -> Self {
        Self {
            failure_threshold: config.failure_threshold,
            cooldown: Duration::from_secs(config.cooldown_secs),
        }
    }
}

/// Reported breaker state for an origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CircuitStatus {
    #[serde(rename = "OPEN")]
    Open,
    #[serde(rename = "CLOSED")]
    Closed,
}

impl std::fmt::Display for CircuitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitStatus::Open => write!(f, "OPEN"),
            CircuitStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CircuitEntry {
    failures: u32,
    last_failure: Instant,
}

/// One snapshot row for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitSnapshot {
    pub origin: String,
    pub failures: u32,
    pub status: CircuitStatus,
}

/// Tracks consecutive full-walk failures per origin and suppresses further
/// attempts while an origin is misbehaving.
pub struct OriginCircuitBreaker {
    entries: DashMap<String, CircuitEntry>,
    settings: ArcSwap<CircuitSettings>,
}

impl OriginCircuitBreaker {
    pub fn new(settings: CircuitSettings) -> Self {
        Self {
            entries: DashMap::new(),
            settings: ArcSwap::from_pointee(settings),
        }
    }

    /// Swap in new thresholds; applies to all subsequent checks.
    pub fn update_settings(&self, settings: CircuitSettings) {
        self.settings.store(Arc::new(settings));
    }

    /// Whether fetches for this origin are currently suppressed. Observing
    /// an expired cooldown deletes the entry.
    pub fn is_open(&self, origin: &str) -> bool {
        let settings = **self.settings.load();
        let expired = match self.entries.get(origin) {
            None => return false,
            Some(entry) => {
                if entry.last_failure.elapsed() <= settings.cooldown {
                    return entry.failures >= settings.failure_threshold;
                }
                true
            }
        };
        // The shard read guard is released above; removal is safe here.
        if expired {
            self.entries.remove(origin);
        }
        false
    }

    /// Record a full-walk failure. Returns the updated consecutive count.
    pub fn record_failure(&self, origin: &str) -> u32 {
        let mut entry = self
            .entries
            .entry(origin.to_string())
            .or_insert(CircuitEntry {
                failures: 0,
                last_failure: Instant::now(),
            });
        entry.failures += 1;
        entry.last_failure = Instant::now();
        entry.failures
    }

    /// Any success heals the origin completely.
    pub fn record_success(&self, origin: &str) {
        self.entries.remove(origin);
    }

    /// Current consecutive failure count (0 when no entry exists).
    pub fn failures(&self, origin: &str) -> u32 {
        self.entries.get(origin).map(|e| e.failures).unwrap_or(0)
    }

    pub fn status(&self, origin: &str) -> CircuitStatus {
        if self.is_open(origin) {
            CircuitStatus::Open
        } else {
            CircuitStatus::Closed
        }
    }

    /// Snapshot of every tracked origin, without mutating expiry state.
    pub fn snapshot(&self) -> Vec<CircuitSnapshot> {
        let settings = **self.settings.load();
        self.entries
            .iter()
            .map(|entry| {
                let open = entry.failures >= settings.failure_threshold
                    && entry.last_failure.elapsed() <= settings.cooldown;
                CircuitSnapshot {
                    origin: entry.key().clone(),
                    failures: entry.failures,
                    status: if open {
                        CircuitStatus::Open
                    } else {
                        CircuitStatus::Closed
                    },
                }
            })
            .collect()
    }
}
