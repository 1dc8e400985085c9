//! Desktop audio output for Lofi Player using CPAL
//!
//! Provides [`CpalEngine`], the [`lofi_playback::AudioEngine`] used on
//! desktop. Connected graphs are rendered by `lofi-audio` and summed into
//! the default output device.
//!
//! # Example
//!
//! ```no_run
//! use lofi_audio_desktop::CpalEngine;
//! use lofi_playback::{PlaybackConfig, PlayerHandle};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = CpalEngine::new()?;
//! let player = PlayerHandle::spawn(engine, PlaybackConfig::default());
//! player.load(std::fs::read("track.mp3")?, "track.mp3").await?;
//! player.play().await?;
//! # Ok(())
//! # }
//! ```

mod engine;
mod error;
mod mixer;

pub use engine::CpalEngine;
pub use error::{DesktopAudioError, Result};
pub use mixer::{FrameClock, Mixer};
