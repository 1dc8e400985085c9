//! Common interface of the DSP stages a rendered graph is made of

/// Trait for audio effects placed on graph nodes
///
/// # Safety
/// - Must NOT allocate memory in `process()` once warmed up (real-time constraint)
/// - Must be Send so a compiled graph can move to the audio thread
pub trait AudioEffect: Send {
    /// Process audio buffer in-place
    ///
    /// # Arguments
    /// * `buffer` - Interleaved stereo samples (L, R, L, R, ...)
    /// * `sample_rate` - Sample rate in Hz
    fn process(&mut self, buffer: &mut [f32], sample_rate: u32);

    /// Reset effect state (e.g., when seeking or changing tracks)
    fn reset(&mut self);

    /// Get effect name (for debugging)
    fn name(&self) -> &str;
}

/// Linear gain stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gain {
    gain: f32,
}

impl Gain {
    pub fn new(gain: f32) -> Self {
        Self { gain }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl AudioEffect for Gain {
    fn process(&mut self, buffer: &mut [f32], _sample_rate: u32) {
        if (self.gain - 1.0).abs() < f32::EPSILON {
            return;
        }
        for sample in buffer.iter_mut() {
            *sample *= self.gain;
        }
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "Gain"
    }
}
