//! Block-based rendering of a [`SignalGraph`]
//!
//! A graph is compiled once into processors (one per node), then evaluated
//! in fixed render quanta of [`RENDER_QUANTUM`] frames. Each node sums its
//! inputs into its own interleaved stereo block and processes it in place;
//! nodes are visited in insertion order, which the graph guarantees is
//! topological. Callers may request any number of frames; partial quanta are
//! carried over between calls.

use crate::effects::{AudioEffect, BiquadFilter, ConvolutionReverb, Gain, DEFAULT_PARTITION_SIZE};
use crate::error::{AudioError, Result};
use crate::graph::{NodeId, SignalGraph, Stage};
use lofi_core::{SampleBuffer, SampleRate};
use std::sync::Arc;

/// Frames evaluated per graph pass
pub const RENDER_QUANTUM: usize = DEFAULT_PARTITION_SIZE;

/// Plays a track buffer with linear interpolation at an arbitrary rate
struct SourcePlayer {
    buffer: Arc<SampleBuffer>,
    /// Read position in source frames
    position: f64,
    /// Source frames advanced per output frame at rate 1.0
    rate_ratio: f64,
    rate: f64,
    finished: bool,
}

impl SourcePlayer {
    fn new(buffer: Arc<SampleBuffer>, offset_secs: f64, rate: f64, output_rate: SampleRate) -> Self {
        let source_rate = f64::from(buffer.sample_rate().as_hz());
        let position = (offset_secs.max(0.0) * source_rate).min(buffer.frames() as f64);
        Self {
            rate_ratio: source_rate / f64::from(output_rate.as_hz()),
            finished: position >= buffer.frames() as f64,
            buffer,
            position,
            rate,
        }
    }

    fn render(&mut self, block: &mut [f32]) {
        let frames = self.buffer.frames();
        let step = self.rate * self.rate_ratio;
        let left = self.buffer.channel(0).unwrap_or(&[]);
        let right = self.buffer.channel(1).unwrap_or(left);

        for frame in block.chunks_exact_mut(2) {
            let index = self.position as usize;
            if index >= frames {
                self.finished = true;
                frame[0] = 0.0;
                frame[1] = 0.0;
                continue;
            }

            let frac = (self.position - index as f64) as f32;
            let next = (index + 1).min(frames - 1);
            frame[0] = left[index] + (left[next] - left[index]) * frac;
            frame[1] = right[index] + (right[next] - right[index]) * frac;
            self.position += step;
        }
    }
}

/// Loops a buffer forever at its native rate
struct LoopPlayer {
    buffer: Arc<SampleBuffer>,
    position: usize,
}

impl LoopPlayer {
    fn render(&mut self, block: &mut [f32]) {
        let frames = self.buffer.frames();
        let left = self.buffer.channel(0).unwrap_or(&[]);
        let right = self.buffer.channel(1).unwrap_or(left);

        if frames == 0 {
            block.fill(0.0);
            return;
        }
        for frame in block.chunks_exact_mut(2) {
            frame[0] = left[self.position];
            frame[1] = right[self.position];
            self.position = (self.position + 1) % frames;
        }
    }
}

enum Processor {
    Source(SourcePlayer),
    NoiseLoop(LoopPlayer),
    Effect(Box<dyn AudioEffect>),
    Output,
}

struct CompiledNode {
    processor: Processor,
    inputs: Vec<NodeId>,
    block: Vec<f32>,
}

/// Renders a compiled graph to interleaved stereo
pub struct GraphRenderer {
    nodes: Vec<CompiledNode>,
    output: NodeId,
    sample_rate: SampleRate,
    /// Rendered frames not yet handed out (interleaved)
    pending: Vec<f32>,
    pending_pos: usize,
}

impl GraphRenderer {
    /// Compile `graph` for an output running at `sample_rate`
    ///
    /// # Errors
    /// Fails if the graph has no output, an edge points backwards or out of
    /// range, or a DSP stage cannot be constructed.
    pub fn new(graph: &SignalGraph, sample_rate: SampleRate) -> Result<Self> {
        let output = graph
            .output()
            .ok_or_else(|| AudioError::InvalidGraph("graph has no output node".to_string()))?;

        let count = graph.nodes().len();
        for &(from, to) in graph.edges() {
            if from >= to || to >= count {
                return Err(AudioError::InvalidGraph(format!("edge {from} -> {to}")));
            }
        }

        let sr = sample_rate.as_hz();
        let nodes = graph
            .nodes()
            .iter()
            .enumerate()
            .map(|(id, stage)| -> Result<CompiledNode> {
                let processor = match stage {
                    Stage::Source {
                        buffer,
                        offset_secs,
                        rate,
                    } => Processor::Source(SourcePlayer::new(
                        Arc::clone(buffer),
                        *offset_secs,
                        *rate,
                        sample_rate,
                    )),
                    Stage::LowPass { cutoff_hz, q } => {
                        Processor::Effect(Box::new(BiquadFilter::low_pass(*cutoff_hz, *q, sr)?))
                    }
                    Stage::Peaking {
                        center_hz,
                        gain_db,
                        q,
                    } => Processor::Effect(Box::new(BiquadFilter::peaking(
                        *center_hz, *gain_db, *q, sr,
                    )?)),
                    Stage::Convolver { impulse } => Processor::Effect(Box::new(
                        ConvolutionReverb::from_impulse(impulse, DEFAULT_PARTITION_SIZE)?,
                    )),
                    Stage::Gain { gain } => Processor::Effect(Box::new(Gain::new(*gain))),
                    Stage::NoiseLoop { buffer } => Processor::NoiseLoop(LoopPlayer {
                        buffer: Arc::clone(buffer),
                        position: 0,
                    }),
                    Stage::Output => Processor::Output,
                };

                Ok(CompiledNode {
                    processor,
                    inputs: graph.inputs_of(id).collect(),
                    block: vec![0.0; RENDER_QUANTUM * 2],
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            nodes,
            output,
            sample_rate,
            pending: vec![0.0; RENDER_QUANTUM * 2],
            pending_pos: RENDER_QUANTUM * 2,
        })
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    /// Render and mix into `out` (interleaved stereo, added to existing content)
    pub fn process(&mut self, out: &mut [f32]) {
        let mut written = 0;
        while written < out.len() {
            if self.pending_pos >= self.pending.len() {
                self.render_quantum();
                self.pending_pos = 0;
            }

            let n = (self.pending.len() - self.pending_pos).min(out.len() - written);
            for (dst, src) in out[written..written + n]
                .iter_mut()
                .zip(&self.pending[self.pending_pos..self.pending_pos + n])
            {
                *dst += *src;
            }
            self.pending_pos += n;
            written += n;
        }
    }

    /// Render exactly `frames` frames into a new buffer
    pub fn render_frames(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames * 2];
        self.process(&mut out);
        out
    }

    /// Change the source playback rate in place
    ///
    /// Returns false when the graph has no source.
    pub fn set_rate(&mut self, rate: f64) -> bool {
        let mut changed = false;
        for node in &mut self.nodes {
            if let Processor::Source(source) = &mut node.processor {
                source.rate = rate;
                changed = true;
            }
        }
        changed
    }

    /// True once every non-looping source has run past its end
    ///
    /// Graphs without a source (crackle) never finish.
    pub fn is_finished(&self) -> bool {
        let mut sources = self
            .nodes
            .iter()
            .filter_map(|node| match &node.processor {
                Processor::Source(source) => Some(source.finished),
                _ => None,
            })
            .peekable();
        sources.peek().is_some() && sources.all(|finished| finished)
    }

    fn render_quantum(&mut self) {
        let sr = self.sample_rate.as_hz();
        for idx in 0..self.nodes.len() {
            let (before, rest) = self.nodes.split_at_mut(idx);
            let node = &mut rest[0];

            node.block.fill(0.0);
            for &input in &node.inputs {
                for (dst, src) in node.block.iter_mut().zip(&before[input].block) {
                    *dst += *src;
                }
            }

            match &mut node.processor {
                Processor::Source(source) => source.render(&mut node.block),
                Processor::NoiseLoop(player) => player.render(&mut node.block),
                Processor::Effect(effect) => effect.process(&mut node.block, sr),
                Processor::Output => {}
            }
        }

        self.pending.copy_from_slice(&self.nodes[self.output].block);
    }
}

impl std::fmt::Debug for GraphRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphRenderer")
            .field("nodes", &self.nodes.len())
            .field("sample_rate", &self.sample_rate)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::noise::NoiseBank;
    use crate::test_utils::{calculate_rms, extract_channel, generate_sine_buffer};
    use lofi_core::EffectSet;

    fn ramp(frames: usize, sample_rate: u32) -> Arc<SampleBuffer> {
        let samples: Vec<f32> = (0..frames).map(|i| i as f32 / frames as f32).collect();
        Arc::new(SampleBuffer::new(vec![samples.clone(), samples], SampleRate::new(sample_rate)).unwrap())
    }

    fn dry(buffer: Arc<SampleBuffer>, rate: f64, offset: f64, out_rate: u32) -> GraphRenderer {
        let mut builder = GraphBuilder::new(SampleRate::new(out_rate), NoiseBank::with_seed(1));
        let graph = builder
            .build_chain(buffer, &EffectSet::default(), rate, offset)
            .unwrap();
        GraphRenderer::new(&graph, SampleRate::new(out_rate)).unwrap()
    }

    #[test]
    fn unity_rate_passes_samples_through() {
        let buffer = ramp(2_000, 8_000);
        let mut renderer = dry(Arc::clone(&buffer), 1.0, 0.0, 8_000);

        let out = renderer.render_frames(1_000);
        let left = extract_channel(&out, 0);
        assert_eq!(&left[..], &buffer.channel(0).unwrap()[..1_000]);
    }

    #[test]
    fn offset_starts_mid_buffer() {
        let buffer = ramp(8_000, 8_000);
        let mut renderer = dry(Arc::clone(&buffer), 1.0, 0.5, 8_000);

        let out = renderer.render_frames(10);
        assert!((out[0] - buffer.channel(0).unwrap()[4_000]).abs() < 1e-6);
    }

    #[test]
    fn half_rate_interpolates() {
        let buffer = ramp(1_000, 8_000);
        let mut renderer = dry(Arc::clone(&buffer), 0.5, 0.0, 8_000);

        let left = extract_channel(&renderer.render_frames(100), 0);
        let src = buffer.channel(0).unwrap();
        assert!((left[2] - src[1]).abs() < 1e-6);
        assert!((left[3] - (src[1] + src[2]) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn resamples_to_output_rate() {
        // 4 kHz source on an 8 kHz device advances half a frame per output frame
        let buffer = ramp(400, 4_000);
        let mut renderer = dry(buffer, 1.0, 0.0, 8_000);

        // Source ends at output frame 800, inside the second quantum
        renderer.render_frames(RENDER_QUANTUM);
        assert!(!renderer.is_finished());
        renderer.render_frames(RENDER_QUANTUM);
        assert!(renderer.is_finished());
    }

    #[test]
    fn mono_source_feeds_both_channels() {
        let buffer = Arc::new(SampleBuffer::mono(vec![0.25; 600], SampleRate::new(8_000)).unwrap());
        let mut renderer = dry(buffer, 1.0, 0.0, 8_000);

        let out = renderer.render_frames(10);
        assert!(out.iter().all(|s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn process_mixes_into_existing_content() {
        let buffer = Arc::new(SampleBuffer::mono(vec![0.25; 600], SampleRate::new(8_000)).unwrap());
        let mut renderer = dry(buffer, 1.0, 0.0, 8_000);

        let mut out = vec![0.5; 20];
        renderer.process(&mut out);
        assert!(out.iter().all(|s| (s - 0.75).abs() < 1e-6));
    }

    #[test]
    fn set_rate_applies_live() {
        let buffer = ramp(10_000, 8_000);
        let mut renderer = dry(Arc::clone(&buffer), 1.0, 0.0, 8_000);
        renderer.render_frames(RENDER_QUANTUM);

        assert!(renderer.set_rate(2.0));
        let left = extract_channel(&renderer.render_frames(RENDER_QUANTUM), 0);
        let src = buffer.channel(0).unwrap();
        assert!((left[1] - src[RENDER_QUANTUM + 2]).abs() < 1e-6);
    }

    #[test]
    fn crackle_loops_forever() {
        let mut builder = GraphBuilder::new(SampleRate::new(1_000), NoiseBank::with_seed(9));
        let graph = builder.build_crackle().unwrap();
        let mut renderer = GraphRenderer::new(&graph, SampleRate::new(1_000)).unwrap();

        let out = renderer.render_frames(10_000);
        assert!(!renderer.is_finished());
        assert!(out.iter().all(|s| s.abs() <= 0.5 * 0.15 + 1e-6));
        // Loop length is 3 s = 3000 frames at 1 kHz
        assert_eq!(out[0], out[3_000 * 2]);
    }

    #[test]
    fn lofi_attenuates_high_frequencies() {
        let tone = Arc::new(generate_sine_buffer(10_000.0, 44_100, 0.5, 2));
        let mut builder = GraphBuilder::new(SampleRate::CD_QUALITY, NoiseBank::with_seed(2));

        let plain = builder
            .build_chain(Arc::clone(&tone), &EffectSet::default(), 1.0, 0.0)
            .unwrap();
        let lofi = builder
            .build_chain(
                tone,
                &EffectSet {
                    lofi: true,
                    ..EffectSet::default()
                },
                1.0,
                0.0,
            )
            .unwrap();

        let render = |graph: &SignalGraph| {
            let mut renderer = GraphRenderer::new(graph, SampleRate::CD_QUALITY).unwrap();
            calculate_rms(&renderer.render_frames(20_000)[4_000..])
        };
        let dry_rms = render(&plain);
        let wet_rms = render(&lofi);
        assert!(wet_rms < dry_rms * 0.25, "dry {dry_rms}, lofi {wet_rms}");
    }

    #[test]
    fn rejects_graph_without_output() {
        let mut graph = SignalGraph::new();
        graph.add(Stage::Gain { gain: 1.0 });
        assert!(matches!(
            GraphRenderer::new(&graph, SampleRate::CD_QUALITY),
            Err(AudioError::InvalidGraph(_))
        ));
    }
}
