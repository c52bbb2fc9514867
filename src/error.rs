//! Error types for feedcore operations.

use thiserror::Error;

/// Result type alias for feedcore operations.
pub type Result<T> = std::result::Result<T, FeedError>;

/// Main error type for feedcore operations.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Remote call failed or timed out
    #[error("Network error: {0}")]
    Network(String),

    /// Input rejected before dispatch (empty content, malformed id, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Server-reported conflict (stale id, parent already gone)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl FeedError {
    /// Creates a new network error.
    pub fn network<T: ToString>(msg: T) -> Self {
        Self::Network(msg.to_string())
    }

    /// Creates a new validation error.
    pub fn validation<T: ToString>(msg: T) -> Self {
        Self::Validation(msg.to_string())
    }

    /// Creates a new conflict error.
    pub fn conflict<T: ToString>(msg: T) -> Self {
        Self::Conflict(msg.to_string())
    }

    /// Creates a new serialization error.
    pub fn serialization<T: ToString>(msg: T) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Creates a new invalid input error.
    pub fn invalid_input<T: ToString>(msg: T) -> Self {
        Self::InvalidInput(msg.to_string())
    }

    /// Returns true if this error came from the transport layer.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
