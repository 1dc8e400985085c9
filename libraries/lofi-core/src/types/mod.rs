mod audio;
mod effects;
mod track;
mod transport;

pub use audio::{SampleBuffer, SampleRate};
pub use effects::{BaseRate, EffectName, EffectSet};
pub use track::{Preferences, SavedTrackEntry, SavedTracks, TrackInfo, MAX_SAVED_TRACKS};
pub use transport::{format_time, progress_percent, PlaybackSnapshot, TransportState};
