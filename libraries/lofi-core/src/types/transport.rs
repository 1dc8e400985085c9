//! Transport state and the observable snapshot

use super::effects::EffectSet;
use serde::{Deserialize, Serialize};

/// Transport state of the player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    /// Nothing loaded
    #[default]
    Idle,
    /// Track decoded, not yet started
    Loaded,
    /// Graph connected and producing audio
    Playing,
    /// Graph torn down, position retained
    Paused,
    /// Reached end of track, position reset
    Ended,
}

/// Progress in percent, clamped to `[0, 100]`
///
/// Reports 0 when the duration is zero, negative or not finite.
pub fn progress_percent(current_time: f64, duration: f64) -> f64 {
    if !duration.is_finite() || duration <= 0.0 || !current_time.is_finite() {
        return 0.0;
    }
    (current_time / duration * 100.0).clamp(0.0, 100.0)
}

/// Format seconds as `m:ss` for display
///
/// Non-finite and negative inputs render as `0:00`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "0:00".to_string();
    }
    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}

/// Everything the presentation layer observes about playback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSnapshot {
    pub state: TransportState,
    /// Seconds from the start of the track
    pub current_time: f64,
    /// Track length in seconds
    pub duration: f64,
    /// Percent, `[0, 100]`
    pub progress: f64,
    pub effects: EffectSet,
    pub effective_rate: f64,
    pub base_rate: f64,
    pub track_name: Option<String>,
}

impl PlaybackSnapshot {
    /// Snapshot of an empty player
    pub fn idle(effects: EffectSet, base_rate: f64, effective_rate: f64) -> Self {
        Self {
            state: TransportState::Idle,
            current_time: 0.0,
            duration: 0.0,
            progress: 0.0,
            effects,
            effective_rate,
            base_rate,
            track_name: None,
        }
    }

    /// Check if audio is playing
    pub fn is_playing(&self) -> bool {
        self.state == TransportState::Playing
    }
}
