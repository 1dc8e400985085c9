//! File-backed persistence tests

use lofi_core::{
    BaseRate, EffectSet, PersistenceAdapter, Preferences, SavedTrackEntry, MAX_SAVED_TRACKS,
};
use lofi_storage::{SettingsStore, SETTING_BASE_RATE, SETTING_EFFECTS};
use serde_json::json;
use tempfile::TempDir;

// ===== Test Helpers =====

fn entry(name: &str) -> SavedTrackEntry {
    SavedTrackEntry::new(name, format!("https://cdn.example/{name}.mp3"))
}

async fn open(dir: &TempDir) -> SettingsStore {
    SettingsStore::open(dir.path().join("settings.json"))
        .await
        .unwrap()
}

// ===== Tests =====

#[tokio::test]
async fn preferences_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let preferences = Preferences {
        effects: EffectSet {
            lofi: true,
            vinyl_crackle: true,
            ..EffectSet::default()
        },
        base_rate: BaseRate::new(0.6).unwrap(),
    };

    open(&dir).await.save_preferences(&preferences).await.unwrap();

    let reopened = open(&dir).await;
    assert_eq!(reopened.load_preferences().await.unwrap(), Some(preferences));
}

#[tokio::test]
async fn missing_preferences_are_none() {
    let dir = TempDir::new().unwrap();
    assert_eq!(open(&dir).await.load_preferences().await.unwrap(), None);
}

#[tokio::test]
async fn partial_preferences_fill_defaults() {
    let store = SettingsStore::in_memory();
    store.set(SETTING_BASE_RATE, &0.9).await.unwrap();

    let preferences = store.load_preferences().await.unwrap().unwrap();
    assert_eq!(preferences.effects, EffectSet::default());
    assert_eq!(preferences.base_rate.value(), 0.9);
}

#[tokio::test]
async fn stored_rate_out_of_range_is_clamped() {
    let store = SettingsStore::in_memory();
    store.set_setting(SETTING_BASE_RATE, json!(3.0)).await.unwrap();

    let preferences = store.load_preferences().await.unwrap().unwrap();
    assert_eq!(preferences.base_rate.value(), BaseRate::MAX);
}

#[tokio::test]
async fn corrupt_effects_surface_as_storage_error() {
    let store = SettingsStore::in_memory();
    store.set_setting(SETTING_EFFECTS, json!("everything")).await.unwrap();

    let err = store.load_preferences().await.unwrap_err();
    assert!(matches!(err, lofi_core::LofiError::Storage(_)), "{err:?}");
}

#[tokio::test]
async fn saved_tracks_are_capped_and_deduplicated() {
    let dir = TempDir::new().unwrap();
    let store = open(&dir).await;

    for i in 0..12 {
        store.save_track(entry(&format!("track-{i}"))).await.unwrap();
    }
    store.save_track(entry("track-5")).await.unwrap();

    let tracks = open(&dir).await.load_saved_tracks().await.unwrap();
    assert_eq!(tracks.len(), MAX_SAVED_TRACKS);
    assert_eq!(tracks[0].name, "track-5");
    assert_eq!(tracks[1].name, "track-11");
    assert_eq!(tracks.iter().filter(|t| t.name == "track-5").count(), 1);
    assert!(tracks.iter().all(|t| t.name != "track-0" && t.name != "track-1"));
}

#[tokio::test]
async fn unreadable_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, b"{ not json").unwrap();

    let store = SettingsStore::open(&path).await.unwrap();
    assert!(store.keys().await.is_empty());

    store.save_track(entry("fresh")).await.unwrap();
    let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert!(raw.is_object());
}

#[tokio::test]
async fn creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("settings.json");

    let store = SettingsStore::open(&path).await.unwrap();
    store.save_track(entry("a")).await.unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("json.tmp").exists());
}
