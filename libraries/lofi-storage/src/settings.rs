//! User settings store
//!
//! Settings are key-value pairs with JSON values, held in memory and
//! written through to a single JSON file. Writes go to a temporary file
//! that is renamed over the original, so a crash never leaves a torn file.
//!
//! # Example
//!
//! ```rust,no_run
//! use lofi_storage::{SettingsStore, SETTING_BASE_RATE};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SettingsStore::open("settings.json").await?;
//! store.set(SETTING_BASE_RATE, &0.75).await?;
//! let rate: Option<f64> = store.get(SETTING_BASE_RATE).await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, StorageError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Enabled effects (`EffectSet` object)
pub const SETTING_EFFECTS: &str = "effects.preferred";

/// Base playback rate (number, 0.5-1.0)
pub const SETTING_BASE_RATE: &str = "playback.base_rate";

/// Saved-track history (array, most recent first)
pub const SETTING_SAVED_TRACKS: &str = "tracks.saved";

type Settings = BTreeMap<String, Value>;

/// Key-value settings, optionally backed by a file
#[derive(Debug)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    values: Mutex<Settings>,
}

impl SettingsStore {
    /// Open the store at `path`, creating it on first write
    ///
    /// A file that is not valid JSON is ignored with a warning and replaced
    /// on the next write.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match tokio::fs::read(&path).await {
            Ok(bytes) => match parse(&bytes) {
                Ok(values) => values,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "discarding unreadable settings");
                    Settings::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Settings::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), keys = values.len(), "opened settings");

        Ok(Self {
            path: Some(path),
            values: Mutex::new(values),
        })
    }

    /// Store that never touches disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            values: Mutex::new(Settings::new()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Raw JSON value of a setting
    pub async fn get_setting(&self, key: &str) -> Option<Value> {
        self.values.lock().await.get(key).cloned()
    }

    /// Typed value of a setting
    ///
    /// Returns `Ok(None)` if the key is absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get_setting(key)
            .await
            .map(|value| serde_json::from_value(value).map_err(|e| StorageError::serialization(key, &e)))
            .transpose()
    }

    /// Set a raw JSON value and write through
    pub async fn set_setting(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.lock().await;
        values.insert(key.to_string(), value);
        self.flush(&values).await
    }

    /// Set a typed value and write through
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| StorageError::serialization(key, &e))?;
        self.set_setting(key, value).await
    }

    /// Set several values in one write
    pub async fn set_many(&self, entries: Vec<(&str, Value)>) -> Result<()> {
        let mut values = self.values.lock().await;
        for (key, value) in entries {
            values.insert(key.to_string(), value);
        }
        self.flush(&values).await
    }

    /// Read, modify and write back a typed value under one lock
    pub async fn update<T, F>(&self, key: &str, f: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T),
    {
        let mut values = self.values.lock().await;
        let mut current: T = match values.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| StorageError::serialization(key, &e))?,
            None => T::default(),
        };
        f(&mut current);

        let value = serde_json::to_value(&current).map_err(|e| StorageError::serialization(key, &e))?;
        values.insert(key.to_string(), value);
        self.flush(&values).await?;
        Ok(current)
    }

    /// Remove a setting; returns whether it existed
    pub async fn remove(&self, key: &str) -> Result<bool> {
        let mut values = self.values.lock().await;
        if values.remove(key).is_none() {
            return Ok(false);
        }
        self.flush(&values).await?;
        Ok(true)
    }

    pub async fn keys(&self) -> Vec<String> {
        self.values.lock().await.keys().cloned().collect()
    }

    async fn flush(&self, values: &Settings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let bytes = serde_json::to_vec_pretty(values)
            .map_err(|e| StorageError::serialization("<all>", &e))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

fn parse(bytes: &[u8]) -> Result<Settings> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| StorageError::Malformed(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(StorageError::Malformed(format!("expected object, found {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn in_memory_roundtrip() {
        let store = SettingsStore::in_memory();
        assert_eq!(store.get::<f64>(SETTING_BASE_RATE).await.unwrap(), None);

        store.set(SETTING_BASE_RATE, &0.75).await.unwrap();
        assert_eq!(store.get::<f64>(SETTING_BASE_RATE).await.unwrap(), Some(0.75));
        assert!(store.path().is_none());
    }

    #[tokio::test]
    async fn wrong_type_is_serialization_error() {
        let store = SettingsStore::in_memory();
        store.set_setting(SETTING_BASE_RATE, json!("fast")).await.unwrap();

        let err = store.get::<f64>(SETTING_BASE_RATE).await.unwrap_err();
        assert!(matches!(err, StorageError::Serialization { .. }));
    }

    #[tokio::test]
    async fn update_starts_from_default() {
        let store = SettingsStore::in_memory();
        let list = store
            .update::<Vec<u32>, _>("numbers", |v| v.push(1))
            .await
            .unwrap();
        assert_eq!(list, vec![1]);

        let list = store
            .update::<Vec<u32>, _>("numbers", |v| v.push(2))
            .await
            .unwrap();
        assert_eq!(list, vec![1, 2]);
    }

    #[tokio::test]
    async fn remove_reports_presence() {
        let store = SettingsStore::in_memory();
        store.set("a", &1).await.unwrap();
        assert!(store.remove("a").await.unwrap());
        assert!(!store.remove("a").await.unwrap());
        assert!(store.keys().await.is_empty());
    }

    #[test]
    fn parse_rejects_non_objects() {
        assert!(parse(b"[1, 2]").is_err());
        assert!(parse(b"not json").is_err());
        assert_eq!(parse(br#"{"a": 1}"#).unwrap().len(), 1);
    }
}
