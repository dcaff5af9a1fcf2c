//! Outbound HTTP transport.
//!
//! # Responsibilities
//! - Issue a single GET with a profile's headers, timeout and redirect limit
//! - Map client failures to machine-readable categories (DNS, connection,
//!   timeout) that the classifier and the ledger can work with
//!
//! # Design Decisions
//! - The transport is a trait so the recovery loop can be driven by a stub
//!   in tests; the production implementation wraps reqwest
//! - Redirect policy is client-scoped in reqwest, so each attempt builds its
//!   own client with the profile's limit
//! - Per-request timeouts are scaled by the reactive tuning layer

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::fetch::profile::RequestProfile;
use crate::fetch::tuning::TransportTuner;

/// Connection-level failure, distinguishable by category.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("dns lookup failed: {0}")]
    Dns(String),

    #[error("connection refused: {0}")]
    Connect(String),

    #[error("timed out after {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("request failed: {0}")]
    Other(String),
}

/// What came back from the wire. The body has already been decoded into
/// text; status acceptability is judged by the caller.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

/// The outbound HTTP collaborator. One GET per call; headers, timeout and
/// redirect limit come from the profile.
pub trait Transport: Send + Sync {
    fn get(
        &self,
        url: &str,
        profile: &RequestProfile,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send;
}

/// Production transport backed by reqwest.
pub struct ReqwestTransport {
    connect_timeout: Duration,
    tuner: Arc<TransportTuner>,
}

impl ReqwestTransport {
    pub fn new(connect_timeout: Duration, tuner: Arc<TransportTuner>) -> Self {
        Self {
            connect_timeout,
            tuner,
        }
    }

    fn map_error(err: reqwest::Error, timeout: Duration) -> TransportError {
        if err.is_timeout() {
            return TransportError::TimedOut(timeout);
        }
        let detail = source_chain(&err);
        if err.is_connect() {
            if detail.to_lowercase().contains("dns") {
                TransportError::Dns(detail)
            } else {
                TransportError::Connect(detail)
            }
        } else {
            TransportError::Other(detail)
        }
    }
}

/// Flatten an error and its sources into one line; reqwest's top-level
/// message alone often reads "error sending request".
fn source_chain(err: &dyn std::error::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}

impl Transport for ReqwestTransport {
    fn get(
        &self,
        url: &str,
        profile: &RequestProfile,
    ) -> impl Future<Output = Result<TransportResponse, TransportError>> + Send {
        async move {
            let timeout = self.tuner.scaled(profile.timeout);
            let client = reqwest::Client::builder()
                .connect_timeout(self.connect_timeout)
                .timeout(timeout)
                .redirect(reqwest::redirect::Policy::limited(profile.max_redirects))
                .build()
                .map_err(|e| TransportError::Other(e.to_string()))?;

            let mut request = client.get(url);
            for (name, value) in profile.headers {
                request = request.header(*name, *value);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Self::map_error(e, timeout))?;

            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response
                .text()
                .await
                .map_err(|e| Self::map_error(e, timeout))?;

            Ok(TransportResponse {
                status,
                content_type,
                body,
            })
        }
    }
}
