/// Audio-specific errors
use thiserror::Error;

use crate::effects::ConvolutionError;

/// Result type alias using `AudioError`
pub type Result<T> = std::result::Result<T, AudioError>;

/// Audio error types
#[derive(Error, Debug)]
pub enum AudioError {
    /// Container or codec not recognised
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Decoding error
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// Invalid audio buffer
    #[error("Invalid audio buffer: {0}")]
    InvalidBuffer(String),

    /// Filter coefficients could not be computed
    #[error("Filter error: {0}")]
    Filter(String),

    /// Impulse response rejected by the convolver
    #[error(transparent)]
    Convolution(#[from] ConvolutionError),

    /// Graph edges do not form a forward-only chain
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    /// Symphonia error
    #[error("Symphonia error: {0}")]
    Symphonia(String),
}

impl From<AudioError> for lofi_core::LofiError {
    fn from(err: AudioError) -> Self {
        lofi_core::LofiError::decode(err.to_string())
    }
}
