/// Core error types for Lofi Player
use thiserror::Error;

/// Result type alias using `LofiError`
pub type Result<T> = std::result::Result<T, LofiError>;

/// Core error type for Lofi Player
#[derive(Error, Debug)]
pub enum LofiError {
    /// Malformed or unsupported audio bytes
    #[error("Decode error: {0}")]
    Decode(String),

    /// Upstream catalog failure (network, missing result, bad response)
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Persistence collaborator failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl LofiError {
    /// Create a decode error
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create a fetch error
    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// True when the error came from bad audio input rather than infrastructure
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}
