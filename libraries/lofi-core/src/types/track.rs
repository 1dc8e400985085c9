//! Track metadata, saved-track history and persisted preferences

use super::effects::{BaseRate, EffectSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Maximum number of entries kept in the saved-track history
pub const MAX_SAVED_TRACKS: usize = 10;

/// Returned by a successful load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub name: String,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: usize,
}

/// A previously loaded track that can be fetched again
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedTrackEntry {
    /// Display name, also the dedupe key
    pub name: String,
    /// URL or catalog query the bytes came from
    pub source_locator: String,
}

impl SavedTrackEntry {
    pub fn new(name: impl Into<String>, source_locator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_locator: source_locator.into(),
        }
    }
}

/// Bounded most-recent-first list of saved tracks
///
/// Pushing a name already present moves it to the front instead of
/// duplicating it. The oldest entry is discarded once the cap is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<SavedTrackEntry>", into = "Vec<SavedTrackEntry>")]
pub struct SavedTracks {
    /// Most recent = front
    entries: VecDeque<SavedTrackEntry>,
}

impl SavedTracks {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(MAX_SAVED_TRACKS),
        }
    }

    /// Record an entry as most recent
    pub fn push(&mut self, entry: SavedTrackEntry) {
        self.entries.retain(|existing| existing.name != entry.name);
        self.entries.push_front(entry);
        self.entries.truncate(MAX_SAVED_TRACKS);
    }

    /// Find an entry by display name
    pub fn find(&self, name: &str) -> Option<&SavedTrackEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries, most recent first
    pub fn to_vec(&self) -> Vec<SavedTrackEntry> {
        self.entries.iter().cloned().collect()
    }
}

impl Default for SavedTracks {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Vec<SavedTrackEntry>> for SavedTracks {
    fn from(entries: Vec<SavedTrackEntry>) -> Self {
        // Replay oldest first so the resulting order and dedupe match push()
        let mut tracks = Self::new();
        for entry in entries.into_iter().rev() {
            tracks.push(entry);
        }
        tracks
    }
}

impl From<SavedTracks> for Vec<SavedTrackEntry> {
    fn from(tracks: SavedTracks) -> Self {
        tracks.entries.into()
    }
}

/// Persisted user preferences
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub effects: EffectSet,
    pub base_rate: BaseRate,
}
