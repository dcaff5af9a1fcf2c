//! Resilient fetch subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound fetch request:
//!     → fetcher.rs (circuit check, standard attempt, escalation walk)
//!     → profile.rs (ordered catalog of request profiles)
//!     → transport.rs (one GET per attempt, reqwest underneath)
//!     → circuit.rs / ledger.rs (per-origin accounting)
//!     → classify.rs (failure text → category, drives tuning.rs)
//! ```

pub mod circuit;
pub mod classify;
pub mod error;
pub mod fetcher;
pub mod ledger;
pub mod profile;
pub mod transport;
pub mod tuning;

pub use error::FetchError;
pub use fetcher::{origin_key, FetchOutcome, RecoveryStats, ResilientFetcher};
pub use profile::ProfileCatalog;
pub use transport::ReqwestTransport;
