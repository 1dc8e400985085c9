//! Lofi Player Core
//!
//! Platform-agnostic core types, traits, and error handling for Lofi Player.
//!
//! This crate provides the foundational building blocks shared by the audio,
//! playback, storage and catalog crates.
//!
//! # Architecture
//!
//! The core crate defines:
//! - **Domain Types**: `SampleBuffer`, `EffectSet`, `BaseRate`, `TransportState`,
//!   `PlaybackSnapshot`, `SavedTrackEntry`, `Preferences`
//! - **Collaborator Traits**: `AudioDecoder`, `PersistenceAdapter`, `CatalogProvider`
//! - **Error Handling**: Unified `LofiError` and `Result` types
//!
//! # Example
//!
//! ```rust
//! use lofi_core::{BaseRate, EffectName, EffectSet};
//!
//! let mut effects = EffectSet::default();
//! effects.toggle(EffectName::SlowedDown);
//!
//! let rate = BaseRate::new(0.85).unwrap();
//! assert!((rate.effective(&effects) - 0.68).abs() < 1e-9);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{LofiError, Result};
pub use traits::{AudioDecoder, CatalogProvider, FetchedTrack, PersistenceAdapter};

pub use types::{
    // Audio types
    SampleBuffer, SampleRate,
    // Effects and rate
    BaseRate, EffectName, EffectSet,
    // Transport
    format_time, progress_percent, PlaybackSnapshot, TrackInfo, TransportState,
    // Persisted shapes
    Preferences, SavedTrackEntry, SavedTracks, MAX_SAVED_TRACKS,
};
