//! Signal graph description and construction
//!
//! A [`SignalGraph`] is a plain description of the processing chain: typed
//! nodes in topological order plus directed edges. It owns no DSP state, so
//! it can be inspected in tests, compared, and handed to any engine. The
//! [`GraphBuilder`] maps the active effects onto a fixed topology:
//!
//! ```text
//! Source -> [LowPass 3k] -> [Peaking 1.5k +6dB -> LowPass 7k] -> Gain 1.0 -> Output
//!                                                   \-> Convolver -> Gain 0.3 -> Output
//! NoiseLoop -> Gain 0.15 -> Output                        (separate crackle graph)
//! ```

use crate::error::Result;
use crate::noise::NoiseBank;
use lofi_core::{EffectSet, SampleBuffer, SampleRate};
use std::sync::Arc;

/// Lo-fi low-pass cutoff
pub const LOFI_CUTOFF_HZ: f32 = 3_000.0;
/// Butterworth Q used by every low-pass stage
pub const LOW_PASS_Q: f32 = biquad::Q_BUTTERWORTH_F32;
/// Jazz mid boost
pub const JAZZ_PEAK_HZ: f32 = 1_500.0;
pub const JAZZ_PEAK_GAIN_DB: f32 = 6.0;
pub const JAZZ_PEAK_Q: f32 = 1.0;
/// Jazz warmth roll-off
pub const JAZZ_WARMTH_CUTOFF_HZ: f32 = 7_000.0;
/// Level of the reverb return
pub const REVERB_WET_GAIN: f32 = 0.3;
/// Master gain of the chain
pub const MASTER_GAIN: f32 = 1.0;
/// Level of the crackle bed
pub const CRACKLE_GAIN: f32 = 0.15;

/// Index of a node within its graph
pub type NodeId = usize;

/// One processing stage
#[derive(Debug, Clone)]
pub enum Stage {
    /// Track buffer played from `offset_secs` at `rate`
    Source {
        buffer: Arc<SampleBuffer>,
        offset_secs: f64,
        rate: f64,
    },
    LowPass {
        cutoff_hz: f32,
        q: f32,
    },
    Peaking {
        center_hz: f32,
        gain_db: f32,
        q: f32,
    },
    /// Convolution with a stereo impulse response
    Convolver {
        impulse: Arc<SampleBuffer>,
    },
    Gain {
        gain: f32,
    },
    /// Endlessly looping buffer
    NoiseLoop {
        buffer: Arc<SampleBuffer>,
    },
    /// Sink; sums everything connected to it
    Output,
}

impl Stage {
    /// Short label for logs and debugging
    pub fn label(&self) -> &'static str {
        match self {
            Self::Source { .. } => "source",
            Self::LowPass { .. } => "lowpass",
            Self::Peaking { .. } => "peaking",
            Self::Convolver { .. } => "convolver",
            Self::Gain { .. } => "gain",
            Self::NoiseLoop { .. } => "noise-loop",
            Self::Output => "output",
        }
    }
}

/// Directed processing graph
///
/// Nodes are stored in insertion order and every edge points from a lower
/// id to a higher one, so insertion order is a valid evaluation order.
#[derive(Debug, Clone, Default)]
pub struct SignalGraph {
    nodes: Vec<Stage>,
    edges: Vec<(NodeId, NodeId)>,
}

impl SignalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node
    pub fn add(&mut self, stage: Stage) -> NodeId {
        self.nodes.push(stage);
        self.nodes.len() - 1
    }

    /// Connect `from` into `to`
    pub fn connect(&mut self, from: NodeId, to: NodeId) {
        debug_assert!(from < to, "edges must point forward ({from} -> {to})");
        self.edges.push((from, to));
    }

    pub fn nodes(&self) -> &[Stage] {
        &self.nodes
    }

    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    pub fn node(&self, id: NodeId) -> Option<&Stage> {
        self.nodes.get(id)
    }

    /// Nodes feeding into `id`
    pub fn inputs_of(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges
            .iter()
            .filter(move |(_, to)| *to == id)
            .map(|(from, _)| *from)
    }

    /// The sink node
    pub fn output(&self) -> Option<NodeId> {
        self.nodes.iter().position(|stage| matches!(stage, Stage::Output))
    }

    /// Count nodes matching a predicate
    pub fn count(&self, predicate: impl Fn(&Stage) -> bool) -> usize {
        self.nodes.iter().filter(|stage| predicate(stage)).count()
    }

    /// Cutoffs of all low-pass stages, in chain order
    pub fn low_pass_cutoffs(&self) -> Vec<f32> {
        self.nodes
            .iter()
            .filter_map(|stage| match stage {
                Stage::LowPass { cutoff_hz, .. } => Some(*cutoff_hz),
                _ => None,
            })
            .collect()
    }

    pub fn has_convolver(&self) -> bool {
        self.count(|stage| matches!(stage, Stage::Convolver { .. })) > 0
    }

    /// True for the standalone crackle graph
    pub fn is_crackle(&self) -> bool {
        self.count(|stage| matches!(stage, Stage::NoiseLoop { .. })) > 0
    }

    /// Playback rate of the source, if the graph has one
    pub fn source_rate(&self) -> Option<f64> {
        self.nodes.iter().find_map(|stage| match stage {
            Stage::Source { rate, .. } => Some(*rate),
            _ => None,
        })
    }

    /// Start offset of the source, if the graph has one
    pub fn source_offset(&self) -> Option<f64> {
        self.nodes.iter().find_map(|stage| match stage {
            Stage::Source { offset_secs, .. } => Some(*offset_secs),
            _ => None,
        })
    }

    /// Human-readable chain, e.g. `source -> lowpass -> gain -> output`
    pub fn describe(&self) -> String {
        self.nodes
            .iter()
            .map(Stage::label)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

/// Builds signal graphs for one output device
///
/// Owns the session [`NoiseBank`] so crackle and impulse buffers are
/// synthesized once and reused across rebuilds.
#[derive(Debug)]
pub struct GraphBuilder {
    output_rate: SampleRate,
    bank: NoiseBank,
}

impl GraphBuilder {
    pub fn new(output_rate: SampleRate, bank: NoiseBank) -> Self {
        Self { output_rate, bank }
    }

    pub fn output_rate(&self) -> SampleRate {
        self.output_rate
    }

    /// Build the processing chain for a track
    ///
    /// Filters are only inserted for enabled effects, in the fixed order
    /// lo-fi, then jazz. The reverb taps the last filter stage, bypasses the
    /// master gain and sums at the output.
    pub fn build_chain(
        &mut self,
        buffer: Arc<SampleBuffer>,
        effects: &EffectSet,
        rate: f64,
        offset_secs: f64,
    ) -> Result<SignalGraph> {
        let mut graph = SignalGraph::new();
        let mut last = graph.add(Stage::Source {
            buffer,
            offset_secs,
            rate,
        });

        if effects.lofi {
            let lowpass = graph.add(Stage::LowPass {
                cutoff_hz: LOFI_CUTOFF_HZ,
                q: LOW_PASS_Q,
            });
            graph.connect(last, lowpass);
            last = lowpass;
        }

        if effects.jazz {
            let peak = graph.add(Stage::Peaking {
                center_hz: JAZZ_PEAK_HZ,
                gain_db: JAZZ_PEAK_GAIN_DB,
                q: JAZZ_PEAK_Q,
            });
            graph.connect(last, peak);
            let warmth = graph.add(Stage::LowPass {
                cutoff_hz: JAZZ_WARMTH_CUTOFF_HZ,
                q: LOW_PASS_Q,
            });
            graph.connect(peak, warmth);
            last = warmth;
        }

        let reverb_return = if effects.reverb {
            let impulse = self.bank.impulse_response(self.output_rate)?;
            let convolver = graph.add(Stage::Convolver { impulse });
            graph.connect(last, convolver);
            let wet = graph.add(Stage::Gain {
                gain: REVERB_WET_GAIN,
            });
            graph.connect(convolver, wet);
            Some(wet)
        } else {
            None
        };

        let master = graph.add(Stage::Gain { gain: MASTER_GAIN });
        graph.connect(last, master);

        let output = graph.add(Stage::Output);
        graph.connect(master, output);
        if let Some(wet) = reverb_return {
            graph.connect(wet, output);
        }

        Ok(graph)
    }

    /// Build the standalone crackle graph
    pub fn build_crackle(&mut self) -> Result<SignalGraph> {
        let buffer = self.bank.vinyl_noise(self.output_rate)?;

        let mut graph = SignalGraph::new();
        let noise = graph.add(Stage::NoiseLoop { buffer });
        let gain = graph.add(Stage::Gain { gain: CRACKLE_GAIN });
        let output = graph.add(Stage::Output);
        graph.connect(noise, gain);
        graph.connect(gain, output);
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::silent_buffer;
    use lofi_core::EffectName;
    use proptest::prelude::*;

    fn builder() -> GraphBuilder {
        GraphBuilder::new(SampleRate::new(8_000), NoiseBank::with_seed(3))
    }

    fn track() -> Arc<SampleBuffer> {
        Arc::new(silent_buffer(8_000, 1.0))
    }

    fn effects(names: &[EffectName]) -> EffectSet {
        let mut set = EffectSet::default();
        for name in names {
            set.set(*name, true);
        }
        set
    }

    #[test]
    fn dry_chain_is_source_gain_output() {
        let graph = builder()
            .build_chain(track(), &EffectSet::default(), 0.85, 0.0)
            .unwrap();
        assert_eq!(graph.describe(), "source -> gain -> output");
        assert_eq!(graph.edges(), &[(0, 1), (1, 2)]);
    }

    #[test]
    fn lofi_inserts_single_lowpass() {
        let graph = builder()
            .build_chain(track(), &effects(&[EffectName::Lofi]), 0.85, 0.0)
            .unwrap();
        assert_eq!(graph.low_pass_cutoffs(), vec![LOFI_CUTOFF_HZ]);
        assert_eq!(graph.count(|s| matches!(s, Stage::Peaking { .. })), 0);
        assert!(!graph.has_convolver());
    }

    #[test]
    fn jazz_follows_lofi() {
        let graph = builder()
            .build_chain(track(), &effects(&[EffectName::Jazz, EffectName::Lofi]), 1.0, 0.0)
            .unwrap();
        assert_eq!(
            graph.describe(),
            "source -> lowpass -> peaking -> lowpass -> gain -> output"
        );
        assert_eq!(graph.low_pass_cutoffs(), vec![3_000.0, 7_000.0]);
    }

    #[test]
    fn reverb_taps_before_master_and_sums_at_output() {
        let graph = builder()
            .build_chain(track(), &effects(&[EffectName::Lofi, EffectName::Reverb]), 1.0, 0.0)
            .unwrap();

        let convolver = graph
            .nodes()
            .iter()
            .position(|s| matches!(s, Stage::Convolver { .. }))
            .unwrap();
        let output = graph.output().unwrap();

        // Fed by the low-pass, not by the master gain
        let feeding: Vec<_> = graph.inputs_of(convolver).collect();
        assert!(matches!(graph.node(feeding[0]), Some(Stage::LowPass { .. })));

        // Output sums master and wet return
        let into_output: Vec<_> = graph.inputs_of(output).collect();
        assert_eq!(into_output.len(), 2);
        let gains: Vec<f32> = into_output
            .iter()
            .filter_map(|id| match graph.node(*id) {
                Some(Stage::Gain { gain }) => Some(*gain),
                _ => None,
            })
            .collect();
        assert!(gains.contains(&MASTER_GAIN));
        assert!(gains.contains(&REVERB_WET_GAIN));
    }

    #[test]
    fn crackle_never_enters_chain() {
        let graph = builder()
            .build_chain(track(), &effects(&[EffectName::VinylCrackle]), 1.0, 0.0)
            .unwrap();
        assert!(!graph.is_crackle());
        assert_eq!(graph.describe(), "source -> gain -> output");
    }

    #[test]
    fn crackle_graph_shape() {
        let graph = builder().build_crackle().unwrap();
        assert_eq!(graph.describe(), "noise-loop -> gain -> output");
        assert!(matches!(graph.node(1), Some(Stage::Gain { gain }) if (*gain - CRACKLE_GAIN).abs() < f32::EPSILON));
    }

    #[test]
    fn source_carries_rate_and_offset() {
        let graph = builder()
            .build_chain(track(), &EffectSet::default(), 0.68, 4.5)
            .unwrap();
        assert_eq!(graph.source_rate(), Some(0.68));
        assert_eq!(graph.source_offset(), Some(4.5));
    }

    #[test]
    fn impulse_shared_across_rebuilds() {
        let mut builder = builder();
        let set = effects(&[EffectName::Reverb]);
        let first = builder.build_chain(track(), &set, 1.0, 0.0).unwrap();
        let second = builder.build_chain(track(), &set, 1.0, 2.0).unwrap();

        let impulse = |g: &SignalGraph| {
            g.nodes().iter().find_map(|s| match s {
                Stage::Convolver { impulse } => Some(Arc::clone(impulse)),
                _ => None,
            })
        };
        assert!(Arc::ptr_eq(&impulse(&first).unwrap(), &impulse(&second).unwrap()));
    }

    proptest! {
        #[test]
        fn every_combination_is_forward_only(bits in 0u8..32) {
            let mut set = EffectSet::default();
            for (i, name) in EffectName::ALL.iter().enumerate() {
                set.set(*name, bits & (1 << i) != 0);
            }

            let graph = builder().build_chain(track(), &set, 1.0, 0.0).unwrap();
            prop_assert!(graph.edges().iter().all(|(from, to)| from < to));
            let source_first = matches!(graph.node(0), Some(Stage::Source { .. }));
            prop_assert!(source_first);
            prop_assert_eq!(graph.output(), Some(graph.nodes().len() - 1));
            prop_assert_eq!(graph.has_convolver(), set.reverb);

            let expected_lowpass = usize::from(set.lofi) + usize::from(set.jazz);
            prop_assert_eq!(graph.low_pass_cutoffs().len(), expected_lowpass);
        }
    }
}
