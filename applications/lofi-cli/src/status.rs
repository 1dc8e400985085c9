/// One-line rendering of playback snapshots
use lofi_core::{format_time, PlaybackSnapshot, SavedTrackEntry, TransportState};
use std::fmt::Write;

pub fn status_line(snapshot: &PlaybackSnapshot) -> String {
    let state = match snapshot.state {
        TransportState::Idle => "idle",
        TransportState::Loaded => "loaded",
        TransportState::Playing => "playing",
        TransportState::Paused => "paused",
        TransportState::Ended => "ended",
    };

    let mut line = format!(
        "[{state}] {} {} / {} ({:.0}%) rate {:.2}",
        snapshot.track_name.as_deref().unwrap_or("-"),
        format_time(snapshot.current_time),
        format_time(snapshot.duration),
        snapshot.progress,
        snapshot.effective_rate,
    );

    let effects: Vec<&str> = snapshot.effects.enabled().map(|e| e.as_str()).collect();
    if !effects.is_empty() {
        let _ = write!(line, " fx: {}", effects.join(", "));
    }
    line
}

/// Numbered listing, most recent first
pub fn saved_listing(entries: &[SavedTrackEntry]) -> String {
    if entries.is_empty() {
        return "no saved tracks".to_string();
    }
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("{:>2}. {}  <{}>", i + 1, entry.name, entry.source_locator))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lofi_core::{EffectName, EffectSet};

    #[test]
    fn renders_playing_snapshot() {
        let mut effects = EffectSet::default();
        effects.toggle(EffectName::Lofi);
        let snapshot = PlaybackSnapshot {
            state: TransportState::Playing,
            current_time: 65.0,
            duration: 130.0,
            progress: 50.0,
            effects,
            effective_rate: 0.85,
            base_rate: 0.85,
            track_name: Some("Rain".to_string()),
        };

        assert_eq!(
            status_line(&snapshot),
            "[playing] Rain 1:05 / 2:10 (50%) rate 0.85 fx: lofi"
        );
    }

    #[test]
    fn renders_idle_snapshot() {
        let snapshot = PlaybackSnapshot::idle(EffectSet::default(), 0.85, 0.85);
        assert_eq!(status_line(&snapshot), "[idle] - 0:00 / 0:00 (0%) rate 0.85");
    }

    #[test]
    fn lists_saved_tracks() {
        assert_eq!(saved_listing(&[]), "no saved tracks");
        let entries = vec![SavedTrackEntry::new("Rain", "https://x/rain.mp3")];
        assert_eq!(saved_listing(&entries), " 1. Rain  <https://x/rain.mp3>");
    }
}
