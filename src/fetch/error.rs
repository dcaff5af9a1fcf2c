//! Error taxonomy for the fetch subsystem.
//!
//! Per-attempt failures are accumulated inside the recovery walk and never
//! propagate on their own; only the terminal outcomes below reach a caller.

use thiserror::Error;

use crate::fetch::transport::TransportError;

/// One failed attempt inside the walk. Rendered into the ledger and the
/// classifier, never returned to the caller directly.
#[derive(Debug, Clone, Error)]
pub enum AttemptFailure {
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// Anti-automation or predicate-rejected status; the bytes arrived but
    /// the content is not usable.
    #[error("blocked with status {0}")]
    Blocked(u16),

    /// Plain upstream error status, accepted by the predicate.
    #[error("upstream returned status {0}")]
    Status(u16),
}

/// Terminal outcome of a fetch. Nothing here is fatal to the process.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The origin is suppressed; no network attempt was made.
    #[error("circuit breaker open for {origin} after {failures} recent failures")]
    CircuitOpen { origin: String, failures: u32 },

    /// The standard attempt, the cached profile, and the whole catalog all
    /// failed. Carries the origin's ordered attempt history.
    #[error("all recovery strategies failed for {origin}: {}", attempts.join(", "))]
    AllStrategiesExhausted {
        origin: String,
        attempts: Vec<String>,
    },

    /// The origin answered with a plain error status; not retried.
    #[error("upstream returned status {status}")]
    UpstreamStatus { status: u16 },

    /// The response arrived but is not a web page. Validation error: does
    /// not touch circuit or cache state.
    #[error("response is not HTML (content type: {content_type})")]
    InvalidContent {
        content_type: String,
        recovered: bool,
    },
}

impl FetchError {
    /// Stable machine-readable kind for response payloads and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::CircuitOpen { .. } => "circuit_open",
            FetchError::AllStrategiesExhausted { .. } => "all_strategies_exhausted",
            FetchError::UpstreamStatus { .. } => "upstream_status",
            FetchError::InvalidContent { .. } => "invalid_content",
        }
    }
}
