//! End-to-end tests: decode -> build graph -> render

use lofi_audio::graph::{GraphBuilder, Stage};
use lofi_audio::noise::NoiseBank;
use lofi_audio::render::{GraphRenderer, RENDER_QUANTUM};
use lofi_audio::SymphoniaDecoder;
use lofi_core::{AudioDecoder, EffectName, EffectSet, SampleRate};
use std::io::Cursor;
use std::sync::Arc;

// ===== Test Helpers =====

fn impulse_wav(sample_rate: u32, frames: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..frames {
            let sample = if i < 100 { 16_000i16 } else { 0 };
            writer.write_sample(sample).unwrap();
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn energy(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s * s).sum()
}

fn effects(names: &[EffectName]) -> EffectSet {
    let mut set = EffectSet::default();
    for name in names {
        set.set(*name, true);
    }
    set
}

// ===== Tests =====

#[test]
fn reverb_rings_after_dry_signal_stops() {
    let rate = SampleRate::new(8_000);
    let track = SymphoniaDecoder::new()
        .decode(&impulse_wav(8_000, 4_000), Some("wav"))
        .unwrap();
    let track = Arc::new(track);

    let mut builder = GraphBuilder::new(rate, NoiseBank::with_seed(11));
    let dry = builder
        .build_chain(Arc::clone(&track), &EffectSet::default(), 1.0, 0.0)
        .unwrap();
    let wet = builder
        .build_chain(track, &effects(&[EffectName::Reverb]), 1.0, 0.0)
        .unwrap();

    let dry_out = GraphRenderer::new(&dry, rate).unwrap().render_frames(4_000);
    let wet_out = GraphRenderer::new(&wet, rate).unwrap().render_frames(4_000);

    // Frames 1000.. are silent in the source
    let tail = 1_000 * 2..;
    assert!(energy(&dry_out[tail.clone()]) < 1e-9);
    assert!(energy(&wet_out[tail]) > 1e-4);
}

#[test]
fn every_effect_combination_renders_finite_audio() {
    let rate = SampleRate::new(8_000);
    let track = SymphoniaDecoder::new()
        .decode(&impulse_wav(16_000, 8_000), None)
        .unwrap();
    let track = Arc::new(track);
    let mut builder = GraphBuilder::new(rate, NoiseBank::with_seed(5));

    for bits in 0u8..32 {
        let mut set = EffectSet::default();
        for (i, name) in EffectName::ALL.iter().enumerate() {
            set.set(*name, bits & (1 << i) != 0);
        }

        let graph = builder
            .build_chain(Arc::clone(&track), &set, 0.68, 0.1)
            .unwrap();
        let mut renderer = GraphRenderer::new(&graph, rate).unwrap();
        let out = renderer.render_frames(RENDER_QUANTUM * 3 + 17);
        assert!(out.iter().all(|s| s.is_finite()), "effects {set:?}");
    }
}

#[test]
fn crackle_graph_is_independent_of_track() {
    let mut builder = GraphBuilder::new(SampleRate::new(8_000), NoiseBank::with_seed(5));
    let crackle = builder.build_crackle().unwrap();

    assert!(crackle
        .nodes()
        .iter()
        .all(|stage| !matches!(stage, Stage::Source { .. })));

    let mut renderer = GraphRenderer::new(&crackle, SampleRate::new(8_000)).unwrap();
    let out = renderer.render_frames(8_000 * 4);
    assert!(energy(&out) > 0.0);
    assert!(!renderer.is_finished());
}

#[test]
fn playback_finishes_at_end_of_track() {
    let rate = SampleRate::new(8_000);
    let track = Arc::new(
        SymphoniaDecoder::new()
            .decode(&impulse_wav(8_000, 1_000), Some("wav"))
            .unwrap(),
    );

    let mut builder = GraphBuilder::new(rate, NoiseBank::with_seed(5));
    let graph = builder
        .build_chain(track, &EffectSet::default(), 1.0, 0.0)
        .unwrap();
    let mut renderer = GraphRenderer::new(&graph, rate).unwrap();

    renderer.render_frames(RENDER_QUANTUM);
    assert!(!renderer.is_finished());
    renderer.render_frames(RENDER_QUANTUM * 2);
    assert!(renderer.is_finished());
}
