//! Lofi Player Playback
//!
//! Transport state machine for an effects-chain player.
//!
//! A [`PlayerHandle`] drives a controller task that owns the
//! [`AudioEngine`]. The controller rebuilds the signal graph from scratch
//! whenever effects, rate or position change during playback, tracks the
//! position from the engine clock and publishes [`PlaybackSnapshot`]s.
//!
//! # Example
//!
//! ```rust
//! use lofi_core::{EffectName, SampleRate, TransportState};
//! use lofi_playback::testing::MockEngine;
//! use lofi_playback::{PlaybackConfig, PlayerHandle};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> lofi_playback::Result<()> {
//! let (engine, _probe) = MockEngine::new(SampleRate::new(8_000));
//! let player = PlayerHandle::spawn(engine, PlaybackConfig::default());
//!
//! player.toggle_effect(EffectName::Lofi).await?;
//! assert!(player.snapshot().effects.lofi);
//! assert_eq!(player.snapshot().state, TransportState::Idle);
//!
//! player.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`PlaybackSnapshot`]: lofi_core::PlaybackSnapshot

mod controller;
pub mod engine;
mod error;
mod handle;
pub mod testing;
pub mod tracker;
mod types;

pub use engine::{AudioEngine, EngineClock, EngineError, GraphId};
pub use error::{PlaybackError, Result};
pub use handle::{PlayerBuilder, PlayerHandle};
pub use tracker::{Tick, TickSource};
pub use types::{PlaybackConfig, DEFAULT_COMMAND_BUFFER, DEFAULT_SETTLE_DELAY};
