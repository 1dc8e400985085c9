//! Lofi Player Storage
//!
//! File-backed settings with a [`lofi_core::PersistenceAdapter`]
//! implementation for preferences and the saved-track history.

mod adapter;
mod error;
pub mod settings;

pub use error::{Result, StorageError};
pub use settings::{SettingsStore, SETTING_BASE_RATE, SETTING_EFFECTS, SETTING_SAVED_TRACKS};
