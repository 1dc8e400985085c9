//! Property tests for seek and rate laws

use lofi_audio::test_utils::silent_wav;
use lofi_core::{BaseRate, EffectName, SampleRate};
use lofi_playback::testing::MockEngine;
use lofi_playback::{PlaybackConfig, PlayerHandle};
use proptest::prelude::*;

const RATE: u32 = 8_000;
const DURATION: f64 = 4.0;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap()
}

fn spawn_player() -> PlayerHandle {
    let (engine, _probe) = MockEngine::new(SampleRate::new(RATE));
    PlayerHandle::spawn(engine, PlaybackConfig::default().with_noise_seed(3))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn seek_sets_proportional_position(percent in 0.0f64..=100.0) {
        let snap = runtime().block_on(async {
            let player = spawn_player();
            player.load(silent_wav(RATE, DURATION), "t.wav").await.unwrap();
            player.seek(percent).await.unwrap();
            player.snapshot()
        });

        prop_assert!((snap.current_time - percent / 100.0 * DURATION).abs() < 1e-9);
        prop_assert!((snap.progress - percent).abs() < 1e-9);
    }

    #[test]
    fn base_rate_stays_in_range(rate in -10.0f64..10.0, slowed in any::<bool>()) {
        let snap = runtime().block_on(async {
            let player = spawn_player();
            if slowed {
                player.toggle_effect(EffectName::SlowedDown).await.unwrap();
            }
            player.set_base_rate(rate).await.unwrap();
            player.snapshot()
        });

        prop_assert!(snap.base_rate >= BaseRate::MIN && snap.base_rate <= BaseRate::MAX);
        let expected = if slowed {
            snap.base_rate * BaseRate::SLOWED_FACTOR
        } else {
            snap.base_rate
        };
        prop_assert!((snap.effective_rate - expected).abs() < 1e-12);
    }
}
