//! JSON payload types for the service API.
//!
//! Field names follow the camelCase convention the front end expects.

use serde::Serialize;

use crate::fetch::classify::Diagnosis;
use crate::fetch::fetcher::RecoveryStats;

/// Body of a successful `/fetch-url` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchSuccess {
    pub html: String,
    pub status: u16,
    pub content_type: String,
    pub response_time_ms: u64,
    pub recovered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy_used: Option<&'static str>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_stats: Option<RecoveryStats>,
}

/// Body of a failed `/fetch-url` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchFailure {
    pub error: String,
    pub suggestion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub response_time_ms: u64,
    pub recovery_attempted: bool,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_history: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnosis: Option<Diagnosis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recovery_stats: Option<RecoveryStats>,
}

/// Body of `/health`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub uptime_secs: u64,
    pub fetches: u64,
    pub recoveries: u64,
    pub exhaustions: u64,
}
