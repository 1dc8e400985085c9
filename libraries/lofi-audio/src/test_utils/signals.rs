//! Test signal generation and analysis

use lofi_core::{SampleBuffer, SampleRate};
use std::f32::consts::PI;
use std::io::Cursor;

/// Generate a sine wave as planar channels
///
/// Every channel carries the same signal at amplitude 0.5.
pub fn generate_sine_channels(
    frequency: f32,
    sample_rate: u32,
    duration: f32,
    channels: usize,
) -> Vec<Vec<f32>> {
    let num_samples = (sample_rate as f32 * duration) as usize;
    let wave: Vec<f32> = (0..num_samples)
        .map(|i| (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin() * 0.5)
        .collect();
    vec![wave; channels]
}

/// Generate a sine wave as a `SampleBuffer`
pub fn generate_sine_buffer(
    frequency: f32,
    sample_rate: u32,
    duration: f32,
    channels: usize,
) -> SampleBuffer {
    SampleBuffer::new(
        generate_sine_channels(frequency, sample_rate, duration, channels),
        SampleRate::new(sample_rate),
    )
    .expect("generated channels are well-formed")
}

/// Generate a silent stereo buffer of the given length
pub fn silent_buffer(sample_rate: u32, duration_secs: f64) -> SampleBuffer {
    let frames = (f64::from(sample_rate) * duration_secs) as usize;
    SampleBuffer::silence(2, frames, SampleRate::new(sample_rate))
        .expect("silence is well-formed")
}

/// Encode planar channels as a 16-bit PCM WAV file in memory
pub fn encode_wav(channels: &[Vec<f32>], sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: channels.len() as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav header");
        let frames = channels.first().map_or(0, Vec::len);
        for i in 0..frames {
            for channel in channels {
                let sample = (channel[i].clamp(-1.0, 1.0) * 32767.0) as i16;
                writer.write_sample(sample).expect("wav sample");
            }
        }
        writer.finalize().expect("wav finalize");
    }
    cursor.into_inner()
}

/// Encode a silent stereo WAV of the given duration
pub fn silent_wav(sample_rate: u32, duration_secs: f64) -> Vec<u8> {
    let frames = (f64::from(sample_rate) * duration_secs) as usize;
    encode_wav(&[vec![0.0; frames], vec![0.0; frames]], sample_rate)
}

/// Calculate RMS (Root Mean Square) level
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Extract one channel from interleaved stereo
pub fn extract_channel(stereo: &[f32], channel: usize) -> Vec<f32> {
    stereo.iter().skip(channel).step_by(2).copied().collect()
}
