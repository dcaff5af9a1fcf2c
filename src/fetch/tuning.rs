//! Reactive transport tuning.
//!
//! When failures look like slow origins, per-request timeouts widen; any
//! success relaxes them back to the baseline. All of it lives in one
//! atomically-swapped value read by the transport on each request — nothing
//! is ever written to disk.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;

use crate::fetch::classify::Category;

const TIMEOUT_SCALE_STEP: f64 = 1.25;
const TIMEOUT_SCALE_MAX: f64 = 2.0;

/// The knobs the transport reads on every request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportTuning {
    pub timeout_scale: f64,
}

impl Default for TransportTuning {
    fn default() -> Self {
        Self { timeout_scale: 1.0 }
    }
}

/// Holds the current tuning and adjusts it from observed fetch outcomes.
#[derive(Default)]
pub struct TransportTuner {
    current: ArcSwap<TransportTuning>,
}

impl TransportTuner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> TransportTuning {
        **self.current.load()
    }

    /// A profile timeout scaled by the current tuning.
    pub fn scaled(&self, base: Duration) -> Duration {
        base.mul_f64(self.snapshot().timeout_scale)
    }

    /// Widen timeouts on timeout-class failures; other categories leave the
    /// tuning untouched.
    pub fn observe_failure(&self, category: Category) {
        if category != Category::Timeout {
            return;
        }
        self.current.rcu(|tuning| {
            let next = (tuning.timeout_scale * TIMEOUT_SCALE_STEP).min(TIMEOUT_SCALE_MAX);
            Arc::new(TransportTuning {
                timeout_scale: next,
            })
        });
        tracing::debug!(
            timeout_scale = self.snapshot().timeout_scale,
            "widened transport timeouts after repeated slowness"
        );
    }

    /// Any success restores the baseline.
    pub fn observe_success(&self) {
        if self.snapshot() != TransportTuning::default() {
            self.current.store(Arc::new(TransportTuning::default()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_widen_and_cap() {
        let tuner = TransportTuner::new();
        for _ in 0..10 {
            tuner.observe_failure(Category::Timeout);
        }
        assert_eq!(tuner.snapshot().timeout_scale, TIMEOUT_SCALE_MAX);
        assert_eq!(
            tuner.scaled(Duration::from_secs(10)),
            Duration::from_secs(20)
        );
    }

    #[test]
    fn non_timeout_failures_do_not_tune() {
        let tuner = TransportTuner::new();
        tuner.observe_failure(Category::Connection);
        tuner.observe_failure(Category::Blocked);
        assert_eq!(tuner.snapshot(), TransportTuning::default());
    }

    #[test]
    fn success_restores_baseline() {
        let tuner = TransportTuner::new();
        tuner.observe_failure(Category::Timeout);
        assert!(tuner.snapshot().timeout_scale > 1.0);
        tuner.observe_success();
        assert_eq!(tuner.snapshot(), TransportTuning::default());
    }
}
