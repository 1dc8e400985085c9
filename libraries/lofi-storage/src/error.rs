/// Storage-specific errors
use thiserror::Error;

/// Result type alias using `StorageError`
pub type Result<T> = std::result::Result<T, StorageError>;

/// Storage error types
#[derive(Error, Debug)]
pub enum StorageError {
    /// Serialization/deserialization error
    #[error("Serialization error for '{key}': {message}")]
    Serialization { key: String, message: String },

    /// Settings file is not a JSON object
    #[error("Malformed settings file: {0}")]
    Malformed(String),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Create a serialization error for a setting key
    pub fn serialization(key: impl Into<String>, err: &serde_json::Error) -> Self {
        Self::Serialization {
            key: key.into(),
            message: err.to_string(),
        }
    }
}

impl From<StorageError> for lofi_core::LofiError {
    fn from(err: StorageError) -> Self {
        lofi_core::LofiError::storage(err.to_string())
    }
}
