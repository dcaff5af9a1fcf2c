//! Append-only per-origin history of fetch attempts.
//!
//! Purely observational: the fetcher writes to it on every attempt, the
//! stats endpoints read it, and nothing ever consults it for control flow.

use dashmap::DashMap;

/// Per-origin ordered outcome log, unbounded for process lifetime.
#[derive(Default)]
pub struct AttemptLedger {
    entries: DashMap<String, Vec<String>>,
}

impl AttemptLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, origin: &str, entry: String) {
        self.entries.entry(origin.to_string()).or_default().push(entry);
    }

    /// Ordered history for an origin; empty when nothing was recorded.
    pub fn history(&self, origin: &str) -> Vec<String> {
        self.entries
            .get(origin)
            .map(|e| e.value().clone())
            .unwrap_or_default()
    }

    /// All origins with their histories, for the stats endpoint.
    pub fn snapshot(&self) -> Vec<(String, Vec<String>)> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }
}
