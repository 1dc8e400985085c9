//! CPAL-backed audio engine
//!
//! **Architecture**: a dedicated audio thread owns the CPAL `Stream`, which
//! is not `Send` on every platform. The engine talks to it over a bounded
//! crossbeam channel. Graphs are shared with the output callback through
//! the [`Mixer`].

use crate::error::{DesktopAudioError, Result};
use crate::mixer::{FrameClock, Mixer};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use lofi_audio::SignalGraph;
use lofi_core::SampleRate;
use lofi_playback::{AudioEngine, EngineClock, EngineError, GraphId};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

enum AudioCommand {
    Resume {
        reply: Sender<Result<()>>,
    },
    Shutdown,
}

/// Desktop output engine using the default CPAL device
pub struct CpalEngine {
    command_tx: Sender<AudioCommand>,
    mixer: Arc<Mixer>,
    audio_thread: Option<JoinHandle<()>>,
}

impl CpalEngine {
    /// Open the default output device
    ///
    /// The stream is built lazily on the first `resume`.
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(DesktopAudioError::DeviceNotFound)?;

        let config = device.default_output_config()?;
        let sample_rate = config.sample_rate();
        let config = config.config();
        info!(
            sample_rate,
            channels = config.channels,
            "opened output device"
        );

        let mixer = Arc::new(Mixer::new(SampleRate::new(sample_rate)));
        let (command_tx, command_rx) = bounded::<AudioCommand>(32);

        let thread_mixer = Arc::clone(&mixer);
        let audio_thread = thread::Builder::new()
            .name("lofi-audio".to_string())
            .spawn(move || audio_thread_run(device, config, thread_mixer, command_rx))
            .map_err(|e| DesktopAudioError::StreamBuild(e.to_string()))?;

        Ok(Self {
            command_tx,
            mixer,
            audio_thread: Some(audio_thread),
        })
    }

    fn shutdown_thread(&mut self) {
        let _ = self.command_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.audio_thread.take() {
            if handle.join().is_err() {
                warn!("audio thread panicked");
            }
        }
    }
}

impl AudioEngine for CpalEngine {
    fn sample_rate(&self) -> SampleRate {
        self.mixer.sample_rate()
    }

    fn clock(&self) -> Arc<dyn EngineClock> {
        Arc::new(FrameClock::new(Arc::clone(&self.mixer)))
    }

    fn resume(&mut self) -> std::result::Result<(), EngineError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.command_tx
            .send(AudioCommand::Resume { reply: reply_tx })
            .map_err(|_| DesktopAudioError::ThreadClosed)?;
        reply_rx
            .recv()
            .map_err(|_| DesktopAudioError::ThreadClosed)?
            .map_err(EngineError::from)
    }

    fn connect(&mut self, graph: SignalGraph) -> std::result::Result<GraphId, EngineError> {
        let id = self.mixer.connect(&graph)?;
        debug!(graph = id.0, nodes = graph.nodes().len(), "graph connected");
        Ok(id)
    }

    fn disconnect(&mut self, id: GraphId) -> std::result::Result<(), EngineError> {
        self.mixer.disconnect(id)?;
        debug!(graph = id.0, "graph disconnected");
        Ok(())
    }

    fn set_rate(&mut self, id: GraphId, rate: f64) -> std::result::Result<bool, EngineError> {
        self.mixer.set_rate(id, rate)
    }

    fn close(&mut self) {
        self.mixer.clear();
        self.shutdown_thread();
        info!("output closed");
    }
}

impl Drop for CpalEngine {
    fn drop(&mut self) {
        self.shutdown_thread();
    }
}

impl std::fmt::Debug for CpalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpalEngine")
            .field("mixer", &self.mixer)
            .field("running", &self.audio_thread.is_some())
            .finish_non_exhaustive()
    }
}

/// Audio thread main loop; owns the stream for its whole life
fn audio_thread_run(
    device: Device,
    config: StreamConfig,
    mixer: Arc<Mixer>,
    command_rx: Receiver<AudioCommand>,
) {
    let mut stream: Option<Stream> = None;

    while let Ok(command) = command_rx.recv() {
        match command {
            AudioCommand::Resume { reply } => {
                let result = resume_stream(&mut stream, &device, &config, &mixer);
                if let Err(e) = &result {
                    warn!(error = %e, "failed to start output");
                }
                let _ = reply.send(result);
            }
            AudioCommand::Shutdown => break,
        }
    }

    drop(stream);
    debug!("audio thread exited");
}

fn resume_stream(
    stream: &mut Option<Stream>,
    device: &Device,
    config: &StreamConfig,
    mixer: &Arc<Mixer>,
) -> Result<()> {
    if let Some(stream) = stream.as_ref() {
        stream.play()?;
        return Ok(());
    }

    let channels = usize::from(config.channels);
    let callback_mixer = Arc::clone(mixer);
    let mut scratch = Vec::new();
    let built = device.build_output_stream(
        config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            callback_mixer.render(data, channels, &mut scratch);
        },
        |err| error!(error = %err, "audio stream error"),
        None,
    )?;
    built.play()?;
    *stream = Some(built);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "requires an audio output device"]
    fn opens_default_device() {
        let mut engine = CpalEngine::new().unwrap();
        assert!(engine.sample_rate().as_hz() > 0);
        engine.resume().unwrap();
        engine.close();
    }
}
