//! Error types for webhook delivery.
//!
//! Only transport and setup faults surface as errors; an endpoint answering
//! with a non-2xx status is an outcome recorded in the delivery log, not an
//! error raised to the caller.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using [`DeliveryError`].
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Transport and configuration faults during webhook delivery.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    /// Connection failed or the transport dropped mid-request.
    #[error("network error: {0}")]
    Network(String),

    /// The request exceeded the configured timeout.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The HTTP client could not be built or the target URL is unusable.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl DeliveryError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a timeout error.
    pub fn timeout(limit: Duration) -> Self {
        Self::Timeout(limit)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}
