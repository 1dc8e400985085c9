/// Desktop output errors
use lofi_playback::EngineError;
use thiserror::Error;

/// Result type for desktop output operations
pub type Result<T> = std::result::Result<T, DesktopAudioError>;

/// Desktop output errors
#[derive(Debug, Error)]
pub enum DesktopAudioError {
    /// No default output device
    #[error("Audio device not found")]
    DeviceNotFound,

    /// Device configuration could not be queried
    #[error("Device configuration error: {0}")]
    Config(String),

    /// Failed to build output stream
    #[error("Failed to build output stream: {0}")]
    StreamBuild(String),

    /// Failed to start the stream
    #[error("Failed to play stream: {0}")]
    Play(String),

    /// The audio thread has exited
    #[error("Audio thread is not running")]
    ThreadClosed,
}

impl From<cpal::BuildStreamError> for DesktopAudioError {
    fn from(err: cpal::BuildStreamError) -> Self {
        Self::StreamBuild(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for DesktopAudioError {
    fn from(err: cpal::PlayStreamError) -> Self {
        Self::Play(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for DesktopAudioError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<DesktopAudioError> for EngineError {
    fn from(err: DesktopAudioError) -> Self {
        match err {
            DesktopAudioError::Play(msg) => EngineError::Blocked(msg),
            other => EngineError::DeviceUnavailable(other.to_string()),
        }
    }
}

impl From<DesktopAudioError> for lofi_core::LofiError {
    fn from(err: DesktopAudioError) -> Self {
        lofi_core::LofiError::Other(err.to_string())
    }
}
