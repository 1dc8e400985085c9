//! Shared mixer between the controller and the audio callback
//!
//! Connected graphs are compiled into [`GraphRenderer`]s on the caller's
//! thread and handed to the callback under a mutex. The callback counts
//! every frame it renders, which is the engine clock.

use lofi_audio::{GraphRenderer, SignalGraph};
use lofi_core::SampleRate;
use lofi_playback::{EngineClock, EngineError, GraphId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

/// Graphs currently audible plus the frame counter
pub struct Mixer {
    sample_rate: SampleRate,
    graphs: Mutex<Vec<(GraphId, GraphRenderer)>>,
    frames: AtomicU64,
    next_id: AtomicU64,
}

impl Mixer {
    pub fn new(sample_rate: SampleRate) -> Self {
        Self {
            sample_rate,
            graphs: Mutex::new(Vec::new()),
            frames: AtomicU64::new(0),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn sample_rate(&self) -> SampleRate {
        self.sample_rate
    }

    fn graphs(&self) -> MutexGuard<'_, Vec<(GraphId, GraphRenderer)>> {
        self.graphs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Compile and start rendering a graph
    pub fn connect(&self, graph: &SignalGraph) -> Result<GraphId, EngineError> {
        let renderer = GraphRenderer::new(graph, self.sample_rate)
            .map_err(|e| EngineError::Connect(e.to_string()))?;
        let id = GraphId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.graphs().push((id, renderer));
        Ok(id)
    }

    pub fn disconnect(&self, id: GraphId) -> Result<(), EngineError> {
        let mut graphs = self.graphs();
        let index = graphs
            .iter()
            .position(|(graph_id, _)| *graph_id == id)
            .ok_or(EngineError::UnknownGraph(id))?;
        graphs.remove(index);
        Ok(())
    }

    pub fn set_rate(&self, id: GraphId, rate: f64) -> Result<bool, EngineError> {
        let mut graphs = self.graphs();
        let (_, renderer) = graphs
            .iter_mut()
            .find(|(graph_id, _)| *graph_id == id)
            .ok_or(EngineError::UnknownGraph(id))?;
        Ok(renderer.set_rate(rate))
    }

    pub fn clear(&self) {
        self.graphs().clear();
    }

    pub fn graph_count(&self) -> usize {
        self.graphs().len()
    }

    /// Frames rendered since creation
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Fill a device buffer of `channels` interleaved channels
    ///
    /// Runs on the real-time thread: if the controller holds the lock the
    /// buffer is left silent rather than waiting. Skipped buffers do not
    /// advance the clock, since no graph consumed them.
    pub fn render(&self, data: &mut [f32], channels: usize, scratch: &mut Vec<f32>) {
        data.fill(0.0);
        let channels = channels.max(1);
        let frames = data.len() / channels;

        let mut graphs = match self.graphs.try_lock() {
            Ok(graphs) => graphs,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => return,
        };
        scratch.clear();
        scratch.resize(frames * 2, 0.0);
        for (_, renderer) in graphs.iter_mut() {
            renderer.process(scratch);
        }
        write_interleaved(scratch, data, channels);

        self.frames.fetch_add(frames as u64, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for Mixer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mixer")
            .field("sample_rate", &self.sample_rate)
            .field("frames", &self.frames())
            .finish_non_exhaustive()
    }
}

/// Spread a stereo mix over the device layout
///
/// Mono devices get the average; channels past the second stay silent.
fn write_interleaved(stereo: &[f32], data: &mut [f32], channels: usize) {
    for (frame, out) in stereo.chunks_exact(2).zip(data.chunks_exact_mut(channels)) {
        if channels == 1 {
            out[0] = 0.5 * (frame[0] + frame[1]);
        } else {
            out[0] = frame[0];
            out[1] = frame[1];
        }
    }
}

/// Engine clock derived from frames rendered for the device
#[derive(Debug, Clone)]
pub struct FrameClock {
    mixer: Arc<Mixer>,
}

impl FrameClock {
    pub fn new(mixer: Arc<Mixer>) -> Self {
        Self { mixer }
    }
}

impl EngineClock for FrameClock {
    fn now(&self) -> f64 {
        self.mixer.frames() as f64 / f64::from(self.mixer.sample_rate.as_hz().max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lofi_audio::test_utils::{calculate_rms, generate_sine_buffer};
    use lofi_audio::{GraphBuilder, NoiseBank};
    use lofi_core::EffectSet;

    const RATE: u32 = 8_000;

    fn tone_graph() -> SignalGraph {
        let buffer = Arc::new(generate_sine_buffer(440.0, RATE, 1.0, 2));
        GraphBuilder::new(SampleRate::new(RATE), NoiseBank::with_seed(1))
            .build_chain(buffer, &EffectSet::default(), 1.0, 0.0)
            .unwrap()
    }

    #[test]
    fn silent_without_graphs_but_clock_advances() {
        let mixer = Arc::new(Mixer::new(SampleRate::new(RATE)));
        let clock = FrameClock::new(Arc::clone(&mixer));
        let mut data = vec![1.0; 800 * 2];
        let mut scratch = Vec::new();

        mixer.render(&mut data, 2, &mut scratch);

        assert!(data.iter().all(|&s| s == 0.0));
        assert!((clock.now() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn renders_connected_graph_until_disconnected() {
        let mixer = Mixer::new(SampleRate::new(RATE));
        let id = mixer.connect(&tone_graph()).unwrap();
        let mut data = vec![0.0; 1024 * 2];
        let mut scratch = Vec::new();

        mixer.render(&mut data, 2, &mut scratch);
        assert!(calculate_rms(&data) > 0.2);

        mixer.disconnect(id).unwrap();
        mixer.render(&mut data, 2, &mut scratch);
        assert_eq!(calculate_rms(&data), 0.0);
        assert_eq!(mixer.disconnect(id), Err(EngineError::UnknownGraph(id)));
    }

    #[test]
    fn maps_stereo_onto_device_layouts() {
        let mixer = Mixer::new(SampleRate::new(RATE));
        mixer.connect(&tone_graph()).unwrap();
        let mut scratch = Vec::new();

        let mut mono = vec![0.0; 512];
        mixer.render(&mut mono, 1, &mut scratch);
        assert!(calculate_rms(&mono) > 0.2);

        let mut quad = vec![0.0; 512 * 4];
        mixer.render(&mut quad, 4, &mut scratch);
        let rear: Vec<f32> = quad.chunks_exact(4).flat_map(|f| [f[2], f[3]]).collect();
        assert!(rear.iter().all(|&s| s == 0.0));
        let front: Vec<f32> = quad.chunks_exact(4).map(|f| f[0]).collect();
        assert!(calculate_rms(&front) > 0.2);
    }

    #[test]
    fn contended_buffer_is_silent_and_clock_holds() {
        let mixer = Mixer::new(SampleRate::new(RATE));
        mixer.connect(&tone_graph()).unwrap();
        let mut data = vec![1.0; 800 * 2];
        let mut scratch = Vec::new();

        {
            let _held = mixer.graphs();
            mixer.render(&mut data, 2, &mut scratch);
        }
        assert!(data.iter().all(|&s| s == 0.0));
        assert_eq!(mixer.frames(), 0);

        mixer.render(&mut data, 2, &mut scratch);
        assert_eq!(mixer.frames(), 800);
        assert!(calculate_rms(&data) > 0.2);
    }

    #[test]
    fn set_rate_reaches_live_graph() {
        let mixer = Mixer::new(SampleRate::new(RATE));
        let id = mixer.connect(&tone_graph()).unwrap();
        assert_eq!(mixer.set_rate(id, 0.5), Ok(true));
        assert!(mixer.set_rate(GraphId(999), 0.5).is_err());
    }

    #[test]
    fn rejects_graph_without_output() {
        let mixer = Mixer::new(SampleRate::new(RATE));
        let err = mixer.connect(&SignalGraph::new()).unwrap_err();
        assert!(matches!(err, EngineError::Connect(_)));
        assert_eq!(mixer.graph_count(), 0);
    }
}
