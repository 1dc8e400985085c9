//! Error types for the catalog client.

use thiserror::Error;

/// Errors that can occur when fetching tracks from a catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Catalog returned an error response
    #[error("Catalog error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Invalid catalog URL
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(String),

    /// Failed to parse catalog response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Search returned nothing downloadable
    #[error("No downloadable track found for '{0}'")]
    NotFound(String),

    /// Download finished with no bytes
    #[error("Empty download from {0}")]
    EmptyDownload(String),
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

impl From<CatalogError> for lofi_core::LofiError {
    fn from(err: CatalogError) -> Self {
        lofi_core::LofiError::fetch(err.to_string())
    }
}
