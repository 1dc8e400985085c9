/// Audio-related types
use crate::error::{LofiError, Result};
use serde::{Deserialize, Serialize};

/// Sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SampleRate(pub u32);

impl SampleRate {
    /// Common sample rates
    pub const CD_QUALITY: Self = Self(44_100);
    pub const DVD_QUALITY: Self = Self(48_000);

    /// Create a new sample rate
    #[must_use]
    pub fn new(hz: u32) -> Self {
        Self(hz)
    }

    /// Get the sample rate as Hz
    pub fn as_hz(&self) -> u32 {
        self.0
    }
}

/// Decoded PCM audio
///
/// Samples are stored planar as f32 in the range [-1.0, 1.0], one `Vec` per
/// channel. Every channel holds the same number of frames. A buffer is never
/// mutated after construction; callers share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    channels: Vec<Vec<f32>>,
    sample_rate: SampleRate,
}

impl SampleBuffer {
    /// Create a buffer from per-channel sample arrays
    ///
    /// # Errors
    /// Returns `InvalidInput` when there are no channels, the channels differ
    /// in length, or the sample rate is zero.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: SampleRate) -> Result<Self> {
        if channels.is_empty() {
            return Err(LofiError::invalid_input("sample buffer needs at least one channel"));
        }
        if sample_rate.as_hz() == 0 {
            return Err(LofiError::invalid_input("sample rate must be non-zero"));
        }
        let frames = channels[0].len();
        if channels.iter().any(|c| c.len() != frames) {
            return Err(LofiError::invalid_input("channel lengths differ"));
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Create a single-channel buffer
    pub fn mono(samples: Vec<f32>, sample_rate: SampleRate) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    /// Create a silent buffer of the given length
    pub fn silence(channel_count: usize, frames: usize, sample_rate: SampleRate) -> Result<Self> {
        Self::new(vec![vec![0.0; frames]; channel_count], sample_rate)
    }

    /// Sample rate of the buffer
    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// Number of channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples of one channel
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// All channels
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Get the number of frames (samples per channel)
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    /// Get the duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate.as_hz() as f64
    }

    /// Check if the buffer holds no frames
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }
}
