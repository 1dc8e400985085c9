//! Lofi Player Audio
//!
//! Decoding, procedural sources, DSP and signal-graph rendering.
//!
//! This crate provides:
//! - Audio decoding via Symphonia (MP3, FLAC, OGG, WAV, AAC)
//! - Vinyl crackle and reverb impulse synthesis with a per-session cache
//! - The effects graph builder and a block-based renderer
//!
//! # Example: Building and rendering a chain
//!
//! ```rust
//! use lofi_audio::graph::GraphBuilder;
//! use lofi_audio::noise::NoiseBank;
//! use lofi_audio::render::GraphRenderer;
//! use lofi_core::{EffectSet, SampleBuffer, SampleRate};
//! use std::sync::Arc;
//!
//! let track = Arc::new(SampleBuffer::silence(2, 44_100, SampleRate::CD_QUALITY).unwrap());
//! let effects = EffectSet { lofi: true, ..EffectSet::default() };
//!
//! let mut builder = GraphBuilder::new(SampleRate::CD_QUALITY, NoiseBank::with_seed(1));
//! let graph = builder.build_chain(track, &effects, 0.85, 0.0).unwrap();
//! assert_eq!(graph.low_pass_cutoffs(), vec![3000.0]);
//!
//! let mut renderer = GraphRenderer::new(&graph, SampleRate::CD_QUALITY).unwrap();
//! let block = renderer.render_frames(1024);
//! assert_eq!(block.len(), 2048);
//! ```

mod decoder;
pub mod effects;
mod error;
pub mod graph;
pub mod noise;
pub mod render;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use decoder::SymphoniaDecoder;
pub use error::{AudioError, Result};
pub use graph::{GraphBuilder, NodeId, SignalGraph, Stage};
pub use noise::NoiseBank;
pub use render::GraphRenderer;
