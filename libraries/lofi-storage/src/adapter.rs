//! [`PersistenceAdapter`] over the settings store

use crate::settings::{SettingsStore, SETTING_BASE_RATE, SETTING_EFFECTS, SETTING_SAVED_TRACKS};
use async_trait::async_trait;
use lofi_core::{
    BaseRate, EffectSet, LofiError, PersistenceAdapter, Preferences, Result, SavedTrackEntry,
    SavedTracks,
};
use serde_json::Value;
use tracing::debug;

#[async_trait]
impl PersistenceAdapter for SettingsStore {
    async fn load_saved_tracks(&self) -> Result<Vec<SavedTrackEntry>> {
        let tracks: Option<SavedTracks> = self.get(SETTING_SAVED_TRACKS).await?;
        Ok(tracks.map(|t| t.to_vec()).unwrap_or_default())
    }

    async fn save_track(&self, entry: SavedTrackEntry) -> Result<()> {
        let tracks = self
            .update::<SavedTracks, _>(SETTING_SAVED_TRACKS, |tracks| tracks.push(entry))
            .await?;
        debug!(count = tracks.len(), "saved track history updated");
        Ok(())
    }

    async fn load_preferences(&self) -> Result<Option<Preferences>> {
        let effects: Option<EffectSet> = self.get(SETTING_EFFECTS).await?;
        let base_rate: Option<BaseRate> = self.get(SETTING_BASE_RATE).await?;

        if effects.is_none() && base_rate.is_none() {
            return Ok(None);
        }
        Ok(Some(Preferences {
            effects: effects.unwrap_or_default(),
            base_rate: base_rate.unwrap_or_default(),
        }))
    }

    async fn save_preferences(&self, preferences: &Preferences) -> Result<()> {
        let effects = to_value(&preferences.effects)?;
        let base_rate = to_value(&preferences.base_rate)?;
        self.set_many(vec![(SETTING_EFFECTS, effects), (SETTING_BASE_RATE, base_rate)])
            .await?;
        Ok(())
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(LofiError::from)
}
