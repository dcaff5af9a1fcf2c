//! Resilient page-fetch service library.
//!
//! Fetches remote web pages on behalf of callers, escalating through
//! request profiles when origins reject automated requests, with per-origin
//! memory of what worked and circuit breaking for origins that keep
//! failing.

pub mod config;
pub mod fetch;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::FetchConfig;
pub use fetch::fetcher::ResilientFetcher;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
