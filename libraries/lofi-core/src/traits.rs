/// Collaborator traits for Lofi Player
use crate::error::Result;
use crate::types::{Preferences, SampleBuffer, SavedTrackEntry};
use async_trait::async_trait;

/// Audio decoder trait
///
/// Implementers turn encoded audio bytes (mp3, flac, ogg, wav, ...) into a
/// planar `SampleBuffer`.
pub trait AudioDecoder: Send + Sync {
    /// Decode a complete in-memory file
    ///
    /// `hint` is an optional file extension used to speed up probing.
    ///
    /// # Errors
    /// Returns `LofiError::Decode` if the bytes are empty, unrecognised,
    /// contain no audio track, or decode to zero frames.
    fn decode(&self, bytes: &[u8], hint: Option<&str>) -> Result<SampleBuffer>;
}

/// Local persistence of preferences and saved-track history
///
/// Implementations are key-value backed. Failures are reported as
/// `LofiError::Storage`; callers treat them as non-fatal.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Saved tracks, most recent first
    async fn load_saved_tracks(&self) -> Result<Vec<SavedTrackEntry>>;

    /// Record a track as most recent (dedupe by name, capped at 10)
    async fn save_track(&self, entry: SavedTrackEntry) -> Result<()>;

    /// Stored preferences, if any were ever saved
    async fn load_preferences(&self) -> Result<Option<Preferences>>;

    /// Replace the stored preferences
    async fn save_preferences(&self, preferences: &Preferences) -> Result<()>;
}

/// Encoded audio returned by a catalog
#[derive(Debug, Clone)]
pub struct FetchedTrack {
    /// Encoded file contents
    pub bytes: Vec<u8>,
    /// Display name
    pub name: String,
    /// Locator that fetches the same bytes again
    pub locator: String,
}

impl FetchedTrack {
    /// Extension of the locator path, used as a decode hint
    pub fn extension_hint(&self) -> Option<&str> {
        let path = self.locator.split(['?', '#']).next()?;
        let file = path.rsplit('/').next()?;
        let (_, ext) = file.rsplit_once('.')?;
        (!ext.is_empty() && ext.len() <= 5).then_some(ext)
    }
}

/// Remote catalog of tracks
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch a track by search query or direct URL
    ///
    /// # Errors
    /// Returns `LofiError::Fetch` on network failure or when nothing matches.
    async fn fetch_track(&self, query_or_url: &str) -> Result<FetchedTrack>;
}
