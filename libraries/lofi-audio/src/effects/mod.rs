//! Audio effects processing
//!
//! DSP stages used by the signal graph renderer. All stages operate on
//! interleaved stereo f32 samples in the [-1.0, 1.0] range.
//!
//! Available effects:
//! - **BiquadFilter**: low-pass and peaking filters (lo-fi and jazz coloration)
//! - **ConvolutionReverb**: uniformly partitioned FFT convolution
//! - **Gain**: linear amplitude scaling

mod chain;
mod convolution;
mod filter;

pub use chain::{AudioEffect, Gain};
pub use convolution::{ConvolutionError, ConvolutionReverb, PartitionedConvolver, DEFAULT_PARTITION_SIZE};
pub use filter::{BiquadFilter, FilterKind};
