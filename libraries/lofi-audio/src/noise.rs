//! Noise and impulse-response synthesis
//!
//! Produces the two procedural sources the effects need: a looping vinyl
//! crackle bed and a decaying stereo noise burst used as a reverb impulse
//! response. Both are pure functions of the sample rate and an RNG, so tests
//! can seed them. [`NoiseBank`] memoizes them per sample rate for the
//! lifetime of a player session.

use crate::error::{AudioError, Result};
use lofi_core::{SampleBuffer, SampleRate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Length of the crackle loop in seconds
pub const VINYL_NOISE_SECS: u32 = 3;

/// Probability that a crackle sample is a pop
pub const POP_PROBABILITY: f64 = 0.005;

/// Amplitude scale of a pop
pub const POP_GAIN: f32 = 0.5;

/// Amplitude scale of the ambient hiss
pub const HISS_GAIN: f32 = 0.03;

/// Default reverb tail length in seconds
pub const IMPULSE_DURATION_SECS: f64 = 2.0;

/// Exponent of the impulse decay envelope `(1 - n)^k`
const DECAY_EXPONENT: f64 = 1.5;

/// Generate a mono vinyl crackle buffer of `3 * sample_rate` samples
///
/// Each sample is uniform noise in `[-1, 1)` scaled to a pop with
/// probability [`POP_PROBABILITY`], to hiss otherwise. The loop point is not
/// smoothed.
pub fn generate_vinyl_noise<R: Rng>(
    sample_rate: SampleRate,
    rng: &mut R,
) -> Result<SampleBuffer> {
    let len = sample_rate.as_hz() as usize * VINYL_NOISE_SECS as usize;
    let samples = (0..len)
        .map(|_| {
            let noise: f32 = rng.gen_range(-1.0..1.0);
            let gain = if rng.gen_bool(POP_PROBABILITY) {
                POP_GAIN
            } else {
                HISS_GAIN
            };
            noise * gain
        })
        .collect();

    SampleBuffer::mono(samples, sample_rate).map_err(|e| AudioError::InvalidBuffer(e.to_string()))
}

/// Generate a stereo impulse response of decaying noise
///
/// For sample `i` of `len = sample_rate * duration_secs`, each channel holds
/// an independent uniform draw in `[-1, 1)` times `(1 - i/len)^1.5`.
pub fn generate_impulse_response<R: Rng>(
    sample_rate: SampleRate,
    duration_secs: f64,
    rng: &mut R,
) -> Result<SampleBuffer> {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return Err(AudioError::InvalidBuffer(format!(
            "impulse duration must be positive, got {duration_secs}"
        )));
    }

    let len = (f64::from(sample_rate.as_hz()) * duration_secs) as usize;
    let channels = (0..2)
        .map(|_| {
            (0..len)
                .map(|i| {
                    let n = i as f64 / len as f64;
                    let envelope = (1.0 - n).powf(DECAY_EXPONENT) as f32;
                    rng.gen_range(-1.0f32..1.0) * envelope
                })
                .collect()
        })
        .collect();

    SampleBuffer::new(channels, sample_rate).map_err(|e| AudioError::InvalidBuffer(e.to_string()))
}

/// Session-scoped cache of synthesized sources
///
/// Buffers are generated lazily on first use and shared read-only across
/// every graph rebuild at the same sample rate.
pub struct NoiseBank {
    rng: StdRng,
    vinyl: HashMap<u32, Arc<SampleBuffer>>,
    impulse: HashMap<u32, Arc<SampleBuffer>>,
}

impl NoiseBank {
    /// Create a bank seeded from OS entropy
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Create a deterministic bank
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            rng,
            vinyl: HashMap::new(),
            impulse: HashMap::new(),
        }
    }

    /// Crackle loop for the given sample rate
    pub fn vinyl_noise(&mut self, sample_rate: SampleRate) -> Result<Arc<SampleBuffer>> {
        if let Some(buffer) = self.vinyl.get(&sample_rate.as_hz()) {
            return Ok(Arc::clone(buffer));
        }

        let buffer = Arc::new(generate_vinyl_noise(sample_rate, &mut self.rng)?);
        debug!(sample_rate = sample_rate.as_hz(), "synthesized vinyl noise");
        self.vinyl.insert(sample_rate.as_hz(), Arc::clone(&buffer));
        Ok(buffer)
    }

    /// Reverb impulse response for the given sample rate
    pub fn impulse_response(&mut self, sample_rate: SampleRate) -> Result<Arc<SampleBuffer>> {
        if let Some(buffer) = self.impulse.get(&sample_rate.as_hz()) {
            return Ok(Arc::clone(buffer));
        }

        let buffer = Arc::new(generate_impulse_response(
            sample_rate,
            IMPULSE_DURATION_SECS,
            &mut self.rng,
        )?);
        debug!(sample_rate = sample_rate.as_hz(), "synthesized impulse response");
        self.impulse.insert(sample_rate.as_hz(), Arc::clone(&buffer));
        Ok(buffer)
    }
}

impl Default for NoiseBank {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NoiseBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseBank")
            .field("vinyl_rates", &self.vinyl.keys().collect::<Vec<_>>())
            .field("impulse_rates", &self.impulse.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
