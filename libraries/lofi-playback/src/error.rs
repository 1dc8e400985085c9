//! Error types for playback control

use crate::engine::EngineError;
use lofi_audio::AudioError;
use lofi_core::LofiError;
use thiserror::Error;

/// Playback errors
///
/// Cloneable so a single rebuild outcome can be reported to every command
/// that was coalesced into it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlaybackError {
    /// Audio bytes could not be decoded; controller state is untouched
    #[error("Decode error: {0}")]
    Decode(String),

    /// The engine refused to start (no device, start not permitted)
    #[error("Playback blocked: {0}")]
    PlaybackBlocked(String),

    /// Catalog lookup or download failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A newer load started before this one committed
    #[error("Load superseded by a newer load")]
    Superseded,

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Graph construction or connection failed
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Preference or history storage failed
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The controller task has stopped
    #[error("Playback controller is not running")]
    ControllerClosed,
}

impl From<LofiError> for PlaybackError {
    fn from(err: LofiError) -> Self {
        match err {
            LofiError::Decode(msg) => Self::Decode(msg),
            LofiError::Fetch(msg) => Self::Fetch(msg),
            LofiError::Storage(msg) => Self::Persistence(msg),
            LofiError::InvalidInput(msg) | LofiError::Other(msg) => Self::InvalidInput(msg),
            LofiError::Io(e) => Self::Persistence(e.to_string()),
            LofiError::Serialization(e) => Self::Persistence(e.to_string()),
        }
    }
}

impl From<AudioError> for PlaybackError {
    fn from(err: AudioError) -> Self {
        Self::Engine(EngineError::Connect(err.to_string()))
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_playback_errors() {
        assert_eq!(
            PlaybackError::from(LofiError::decode("bad header")),
            PlaybackError::Decode("bad header".to_string())
        );
        assert_eq!(
            PlaybackError::from(LofiError::fetch("404")),
            PlaybackError::Fetch("404".to_string())
        );
        assert!(matches!(
            PlaybackError::from(LofiError::storage("disk full")),
            PlaybackError::Persistence(_)
        ));
    }

    #[test]
    fn audio_errors_surface_as_engine_errors() {
        let err = PlaybackError::from(AudioError::InvalidGraph("no output".to_string()));
        assert!(matches!(err, PlaybackError::Engine(EngineError::Connect(_))));
    }
}
