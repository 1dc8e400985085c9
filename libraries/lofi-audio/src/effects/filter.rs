//! Biquad filters for the lo-fi and jazz colorations
//!
//! Thin stereo wrapper over the `biquad` crate: one Direct Form II
//! Transposed section per channel, sharing coefficients.

use super::AudioEffect;
use crate::error::{AudioError, Result};
use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};
use tracing::warn;

/// Filter response
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKind {
    /// Second-order low-pass at `frequency`
    LowPass,
    /// Bell boost/cut centred on `frequency`
    Peaking { gain_db: f32 },
}

/// Stereo biquad filter
pub struct BiquadFilter {
    kind: FilterKind,
    frequency_hz: f32,
    q: f32,
    sample_rate: u32,
    left: DirectForm2Transposed<f32>,
    right: DirectForm2Transposed<f32>,
}

impl BiquadFilter {
    /// Create a filter of the given response
    ///
    /// The frequency is clamped just below Nyquist so low output rates
    /// (e.g. 8 kHz) still produce a valid, if transparent-ish, filter.
    pub fn new(kind: FilterKind, frequency_hz: f32, q: f32, sample_rate: u32) -> Result<Self> {
        let coeffs = Self::coefficients(kind, frequency_hz, q, sample_rate)?;
        Ok(Self {
            kind,
            frequency_hz,
            q,
            sample_rate,
            left: DirectForm2Transposed::<f32>::new(coeffs),
            right: DirectForm2Transposed::<f32>::new(coeffs),
        })
    }

    /// Low-pass filter
    pub fn low_pass(cutoff_hz: f32, q: f32, sample_rate: u32) -> Result<Self> {
        Self::new(FilterKind::LowPass, cutoff_hz, q, sample_rate)
    }

    /// Peaking EQ filter
    pub fn peaking(center_hz: f32, gain_db: f32, q: f32, sample_rate: u32) -> Result<Self> {
        Self::new(FilterKind::Peaking { gain_db }, center_hz, q, sample_rate)
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn frequency_hz(&self) -> f32 {
        self.frequency_hz
    }

    fn coefficients(
        kind: FilterKind,
        frequency_hz: f32,
        q: f32,
        sample_rate: u32,
    ) -> Result<Coefficients<f32>> {
        if sample_rate == 0 {
            return Err(AudioError::Filter("sample rate must be non-zero".to_string()));
        }
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 || !q.is_finite() || q <= 0.0 {
            return Err(AudioError::Filter(format!(
                "invalid filter parameters: {frequency_hz} Hz, q {q}"
            )));
        }

        let fs = sample_rate as f32;
        let frequency = frequency_hz.min(fs * 0.49);
        let filter_type = match kind {
            FilterKind::LowPass => Type::LowPass,
            FilterKind::Peaking { gain_db } => Type::PeakingEQ(gain_db),
        };

        Coefficients::<f32>::from_params(filter_type, fs.hz(), frequency.hz(), q)
            .map_err(|e| AudioError::Filter(format!("{e:?}")))
    }
}

impl AudioEffect for BiquadFilter {
    fn process(&mut self, buffer: &mut [f32], sample_rate: u32) {
        if sample_rate != self.sample_rate {
            match Self::coefficients(self.kind, self.frequency_hz, self.q, sample_rate) {
                Ok(coeffs) => {
                    self.left.update_coefficients(coeffs);
                    self.right.update_coefficients(coeffs);
                    self.sample_rate = sample_rate;
                }
                Err(e) => warn!(error = %e, sample_rate, "keeping previous filter coefficients"),
            }
        }

        for frame in buffer.chunks_exact_mut(2) {
            frame[0] = self.left.run(frame[0]);
            frame[1] = self.right.run(frame[1]);
        }
    }

    fn reset(&mut self) {
        self.left.reset_state();
        self.right.reset_state();
    }

    fn name(&self) -> &str {
        match self.kind {
            FilterKind::LowPass => "LowPass",
            FilterKind::Peaking { .. } => "Peaking",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::tests::generate_sine;
    use crate::test_utils::calculate_rms;

    fn settled_rms(filter: &mut BiquadFilter, freq: f32) -> f32 {
        let mut buffer = generate_sine(freq, 44_100, 0.5);
        filter.process(&mut buffer, 44_100);
        // Skip the transient
        calculate_rms(&buffer[4_410..])
    }

    #[test]
    fn low_pass_attenuates_above_cutoff() {
        let mut filter = BiquadFilter::low_pass(3_000.0, biquad::Q_BUTTERWORTH_F32, 44_100).unwrap();
        let passband = settled_rms(&mut filter, 200.0);

        filter.reset();
        let stopband = settled_rms(&mut filter, 12_000.0);

        let input = std::f32::consts::FRAC_1_SQRT_2;
        assert!((passband - input).abs() < 0.05, "passband rms {passband}");
        assert!(stopband < input * 0.15, "stopband rms {stopband}");
    }

    #[test]
    fn peaking_boosts_center() {
        let mut filter = BiquadFilter::peaking(1_500.0, 6.0, 1.0, 44_100).unwrap();
        let boosted = settled_rms(&mut filter, 1_500.0);
        let input = std::f32::consts::FRAC_1_SQRT_2;

        // +6 dB is a factor of ~2
        assert!(boosted / input > 1.8 && boosted / input < 2.2, "gain {}", boosted / input);
    }

    #[test]
    fn cutoff_above_nyquist_is_clamped() {
        assert!(BiquadFilter::low_pass(7_000.0, 0.7071, 8_000).is_ok());
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(BiquadFilter::low_pass(0.0, 0.7071, 44_100).is_err());
        assert!(BiquadFilter::low_pass(1_000.0, -1.0, 44_100).is_err());
        assert!(BiquadFilter::low_pass(1_000.0, 0.7071, 0).is_err());
    }

    #[test]
    fn adapts_to_new_sample_rate() {
        let mut filter = BiquadFilter::low_pass(3_000.0, 0.7071, 44_100).unwrap();
        let mut buffer = generate_sine(200.0, 48_000, 0.1);
        filter.process(&mut buffer, 48_000);
        assert!(buffer.iter().all(|s| s.is_finite()));
    }
}
