//! Convolution reverb engine
//!
//! Implements uniformly partitioned overlap-save convolution so multi-second
//! impulse responses can run in real time without added latency. The impulse
//! is split into partitions of `P` samples, each transformed once with a
//! `2P`-point FFT. Every processed block costs one forward FFT, one complex
//! multiply against the first partition and one inverse FFT; contributions
//! of older input blocks are accumulated once per completed block.
//!
//! # Example
//!
//! ```rust
//! use lofi_audio::effects::{AudioEffect, ConvolutionReverb};
//!
//! let mut reverb = ConvolutionReverb::from_channels(&[vec![1.0, 0.5, 0.25]], 64).unwrap();
//! let mut buffer = vec![0.5; 256];
//! reverb.process(&mut buffer, 44100);
//! ```

use super::AudioEffect;
use lofi_core::SampleBuffer;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;
use thiserror::Error;

/// Partition length used by the renderer (matches its render quantum)
pub const DEFAULT_PARTITION_SIZE: usize = 512;

/// Convolution errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConvolutionError {
    /// The impulse response is empty
    #[error("Impulse response is empty")]
    EmptyImpulseResponse,
    /// Invalid channel count (must be 1 or 2)
    #[error("Invalid channel count: {0} (must be 1 or 2)")]
    InvalidChannelCount(usize),
    /// Partition size must be a non-zero power of two
    #[error("Invalid partition size: {0}")]
    InvalidPartitionSize(usize),
}

/// Single-channel partitioned convolver
pub struct PartitionedConvolver {
    partition: usize,
    fft_forward: Arc<dyn Fft<f32>>,
    fft_inverse: Arc<dyn Fft<f32>>,
    /// Spectra of the impulse partitions, `H_0..H_{K-1}`
    ir_spectra: Vec<Vec<Complex<f32>>>,
    /// Spectra of the last `K-1` complete input windows (ring, zero = silence)
    history: Vec<Vec<Complex<f32>>>,
    /// Index of the most recent entry in `history`
    head: usize,
    /// Sum of `H_k * X_{b-k}` for `k >= 1`, fixed for the current block
    tail: Vec<Complex<f32>>,
    /// Last complete input block
    previous: Vec<f32>,
    /// Block being filled
    current: Vec<f32>,
    fill: usize,
    spectrum: Vec<Complex<f32>>,
    product: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl PartitionedConvolver {
    /// Prepare a convolver for `impulse`
    pub fn new(impulse: &[f32], partition: usize) -> Result<Self, ConvolutionError> {
        if impulse.is_empty() {
            return Err(ConvolutionError::EmptyImpulseResponse);
        }
        if partition == 0 || !partition.is_power_of_two() {
            return Err(ConvolutionError::InvalidPartitionSize(partition));
        }

        let fft_size = partition * 2;
        let mut planner = FftPlanner::new();
        let fft_forward = planner.plan_fft_forward(fft_size);
        let fft_inverse = planner.plan_fft_inverse(fft_size);

        let zero = Complex::new(0.0, 0.0);
        let ir_spectra: Vec<Vec<Complex<f32>>> = impulse
            .chunks(partition)
            .map(|chunk| {
                let mut spectrum = vec![zero; fft_size];
                for (slot, &x) in spectrum.iter_mut().zip(chunk) {
                    *slot = Complex::new(x, 0.0);
                }
                fft_forward.process(&mut spectrum);
                spectrum
            })
            .collect();

        let history_len = ir_spectra.len() - 1;
        let scratch_len = fft_forward
            .get_inplace_scratch_len()
            .max(fft_inverse.get_inplace_scratch_len());

        Ok(Self {
            partition,
            fft_forward,
            fft_inverse,
            ir_spectra,
            history: vec![vec![zero; fft_size]; history_len],
            head: 0,
            tail: vec![zero; fft_size],
            previous: vec![0.0; partition],
            current: vec![0.0; partition],
            fill: 0,
            spectrum: vec![zero; fft_size],
            product: vec![zero; fft_size],
            scratch: vec![zero; scratch_len],
        })
    }

    /// Number of impulse partitions
    pub fn partitions(&self) -> usize {
        self.ir_spectra.len()
    }

    /// Convolve `input` into `output` (same length, any length)
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), output.len());
        let p = self.partition;
        let scale = 1.0 / (2 * p) as f32;

        let mut done = 0;
        while done < input.len() {
            let n = (p - self.fill).min(input.len() - done);
            self.current[self.fill..self.fill + n].copy_from_slice(&input[done..done + n]);

            // Window = [previous block, current block zero-padded past fill]
            for (i, slot) in self.spectrum.iter_mut().enumerate() {
                let x = if i < p { self.previous[i] } else { self.current[i - p] };
                *slot = Complex::new(x, 0.0);
            }
            self.fft_forward
                .process_with_scratch(&mut self.spectrum, &mut self.scratch);

            let first = &self.ir_spectra[0];
            for ((out, x), (h, t)) in self
                .product
                .iter_mut()
                .zip(&self.spectrum)
                .zip(first.iter().zip(&self.tail))
            {
                *out = x * h + t;
            }
            self.fft_inverse
                .process_with_scratch(&mut self.product, &mut self.scratch);

            for i in 0..n {
                output[done + i] = self.product[p + self.fill + i].re * scale;
            }

            self.fill += n;
            done += n;
            if self.fill == p {
                self.complete_block();
            }
        }
    }

    /// Push the finished window into history and precompute the next tail
    fn complete_block(&mut self) {
        let len = self.history.len();
        if len > 0 {
            self.head = (self.head + 1) % len;
            self.history[self.head].copy_from_slice(&self.spectrum);
        }

        for t in &mut self.tail {
            *t = Complex::new(0.0, 0.0);
        }
        for k in 1..self.ir_spectra.len() {
            let past = &self.history[(self.head + len - (k - 1)) % len];
            for ((t, h), x) in self.tail.iter_mut().zip(&self.ir_spectra[k]).zip(past) {
                *t += h * x;
            }
        }

        std::mem::swap(&mut self.previous, &mut self.current);
        self.current.fill(0.0);
        self.fill = 0;
    }

    /// Forget all past input
    pub fn reset(&mut self) {
        let zero = Complex::new(0.0, 0.0);
        for spectrum in &mut self.history {
            spectrum.fill(zero);
        }
        self.tail.fill(zero);
        self.previous.fill(0.0);
        self.current.fill(0.0);
        self.fill = 0;
        self.head = 0;
    }
}

/// Stereo convolution reverb producing the wet signal only
///
/// A mono impulse is applied to both channels; a stereo impulse convolves
/// left with left and right with right.
pub struct ConvolutionReverb {
    left: PartitionedConvolver,
    right: PartitionedConvolver,
    input_left: Vec<f32>,
    input_right: Vec<f32>,
    output_left: Vec<f32>,
    output_right: Vec<f32>,
}

impl ConvolutionReverb {
    /// Build from planar impulse channels (1 or 2)
    pub fn from_channels(channels: &[Vec<f32>], partition: usize) -> Result<Self, ConvolutionError> {
        let (left, right) = match channels {
            [mono] => (mono, mono),
            [left, right] => (left, right),
            other => return Err(ConvolutionError::InvalidChannelCount(other.len())),
        };

        Ok(Self {
            left: PartitionedConvolver::new(left, partition)?,
            right: PartitionedConvolver::new(right, partition)?,
            input_left: Vec::with_capacity(partition),
            input_right: Vec::with_capacity(partition),
            output_left: Vec::with_capacity(partition),
            output_right: Vec::with_capacity(partition),
        })
    }

    /// Build from a decoded or synthesized impulse response
    pub fn from_impulse(impulse: &SampleBuffer, partition: usize) -> Result<Self, ConvolutionError> {
        Self::from_channels(impulse.channels(), partition)
    }
}

impl AudioEffect for ConvolutionReverb {
    fn process(&mut self, buffer: &mut [f32], _sample_rate: u32) {
        let frames = buffer.len() / 2;

        self.input_left.clear();
        self.input_right.clear();
        for frame in buffer.chunks_exact(2) {
            self.input_left.push(frame[0]);
            self.input_right.push(frame[1]);
        }
        self.output_left.resize(frames, 0.0);
        self.output_right.resize(frames, 0.0);

        self.left.process(&self.input_left, &mut self.output_left);
        self.right.process(&self.input_right, &mut self.output_right);

        for (i, frame) in buffer.chunks_exact_mut(2).enumerate() {
            frame[0] = self.output_left[i];
            frame[1] = self.output_right[i];
        }
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    fn name(&self) -> &str {
        "ConvolutionReverb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn direct_convolution(input: &[f32], impulse: &[f32]) -> Vec<f32> {
        (0..input.len())
            .map(|n| {
                (0..impulse.len().min(n + 1))
                    .map(|k| input[n - k] * impulse[k])
                    .sum()
            })
            .collect()
    }

    fn process_in_chunks(conv: &mut PartitionedConvolver, input: &[f32], chunks: &[usize]) -> Vec<f32> {
        let mut output = vec![0.0; input.len()];
        let mut pos = 0;
        let mut i = 0;
        while pos < input.len() {
            let n = chunks[i % chunks.len()].min(input.len() - pos);
            conv.process(&input[pos..pos + n], &mut output[pos..pos + n]);
            pos += n;
            i += 1;
        }
        output
    }

    #[test]
    fn unit_impulse_is_identity() {
        let mut conv = PartitionedConvolver::new(&[1.0], 16).unwrap();
        let input: Vec<f32> = (0..100).map(|i| (i as f32 * 0.37).sin()).collect();

        let output = process_in_chunks(&mut conv, &input, &[7, 16, 3, 32]);
        for (a, b) in input.iter().zip(&output) {
            assert!((a - b).abs() < 1e-5, "{a} vs {b}");
        }
    }

    #[test]
    fn delayed_impulse_shifts_across_block_boundaries() {
        let mut conv = PartitionedConvolver::new(&[0.0, 0.0, 0.0, 1.0], 8).unwrap();
        let input: Vec<f32> = (0..40).map(|i| i as f32).collect();

        let output = process_in_chunks(&mut conv, &input, &[5]);
        for n in 3..40 {
            assert!((output[n] - input[n - 3]).abs() < 1e-3);
        }
        assert!(output[..3].iter().all(|s| s.abs() < 1e-4));
    }

    #[test]
    fn long_impulse_matches_direct_convolution() {
        let mut rng = StdRng::seed_from_u64(42);
        let impulse: Vec<f32> = (0..70).map(|_| rng.gen_range(-0.5..0.5)).collect();
        let input: Vec<f32> = (0..300).map(|_| rng.gen_range(-1.0..1.0)).collect();

        let mut conv = PartitionedConvolver::new(&impulse, 16).unwrap();
        assert_eq!(conv.partitions(), 5);

        let output = process_in_chunks(&mut conv, &input, &[13, 16, 1, 40]);
        let expected = direct_convolution(&input, &impulse);
        for (n, (a, b)) in output.iter().zip(&expected).enumerate() {
            assert!((a - b).abs() < 1e-3, "sample {n}: {a} vs {b}");
        }
    }

    #[test]
    fn reset_clears_tail() {
        let mut conv = PartitionedConvolver::new(&[1.0, 1.0, 1.0, 1.0], 4).unwrap();
        let mut out = vec![0.0; 4];
        conv.process(&[1.0, 0.0, 0.0, 0.0], &mut out);
        conv.reset();

        let mut silent = vec![1.0; 8];
        conv.process(&[0.0; 8], &mut silent);
        assert!(silent.iter().all(|s| s.abs() < 1e-6));
    }

    #[test]
    fn rejects_bad_parameters() {
        assert_eq!(
            PartitionedConvolver::new(&[], 16).err(),
            Some(ConvolutionError::EmptyImpulseResponse)
        );
        assert_eq!(
            PartitionedConvolver::new(&[1.0], 12).err(),
            Some(ConvolutionError::InvalidPartitionSize(12))
        );
        assert_eq!(
            ConvolutionReverb::from_channels(&[vec![1.0], vec![1.0], vec![1.0]], 16).err(),
            Some(ConvolutionError::InvalidChannelCount(3))
        );
    }

    #[test]
    fn stereo_reverb_keeps_channels_apart() {
        let mut reverb =
            ConvolutionReverb::from_channels(&[vec![1.0], vec![0.5]], 8).unwrap();
        let mut buffer = vec![1.0, 1.0, 0.5, 0.5, -1.0, -1.0];
        reverb.process(&mut buffer, 44_100);

        let expected = [1.0, 0.5, 0.5, 0.25, -1.0, -0.5];
        for (a, b) in buffer.iter().zip(&expected) {
            assert!((a - b).abs() < 1e-5);
        }
    }
}
