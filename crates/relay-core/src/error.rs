//! Error types for the relay event pipeline.
//!
//! Not-found and bad-input conditions are reported as typed errors or
//! sentinel returns at the call site; subscriber failures are contained to
//! the event being dispatched and never reach the publisher.

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error type for registry and lookup operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Failure raised by a subscriber while handling an event.
///
/// Contributes to the event's `Failed` status but never aborts sibling
/// subscribers or the bus itself.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SubscriberError {
    /// Human-readable description of what went wrong.
    pub message: String,
}

impl SubscriberError {
    /// Creates a subscriber error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl From<anyhow::Error> for SubscriberError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscriber_error_displays_message() {
        let err = SubscriberError::new("store unavailable");
        assert_eq!(err.to_string(), "store unavailable");
    }
}
