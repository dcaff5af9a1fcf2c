//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (thresholds > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: FetchConfig → Result<(), Vec<ValidationError>>
//! - Runs before a config is accepted into the system, including on reload

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::FetchConfig;

#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a valid socket address")]
    InvalidBindAddress(String),

    #[error("observability.metrics_address '{0}' is not a valid socket address")]
    InvalidMetricsAddress(String),

    #[error("circuit_breaker.failure_threshold must be at least 1")]
    ZeroFailureThreshold,

    #[error("circuit_breaker.cooldown_secs must be at least 1")]
    ZeroCooldown,

    #[error("timeouts.request_secs must be greater than timeouts.connect_secs")]
    RequestTimeoutTooSmall,

    #[error("generation is enabled but generation.endpoint is empty")]
    MissingGenerationEndpoint,

    #[error("generation is enabled but generation.api_key is empty")]
    MissingGenerationKey,
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &FetchConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::ZeroFailureThreshold);
    }
    if config.circuit_breaker.cooldown_secs == 0 {
        errors.push(ValidationError::ZeroCooldown);
    }

    if config.timeouts.request_secs <= config.timeouts.connect_secs {
        errors.push(ValidationError::RequestTimeoutTooSmall);
    }

    if config.generation.enabled {
        if config.generation.endpoint.is_empty() {
            errors.push(ValidationError::MissingGenerationEndpoint);
        }
        if config.generation.api_key.is_empty() {
            errors.push(ValidationError::MissingGenerationKey);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
