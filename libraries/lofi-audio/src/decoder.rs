/// Audio decoder implementation using Symphonia
use crate::error::{AudioError, Result};
use lofi_core::{AudioDecoder, SampleBuffer, SampleRate};
use std::io::Cursor;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// ITU-R BS.775-1 coefficient for center and surround channels (-3dB)
const CENTER_MIX: f32 = 0.707;

/// Audio decoder using Symphonia
///
/// Supports: MP3, FLAC, OGG/Vorbis, WAV, AAC (MP4 container)
///
/// Decodes a complete in-memory file into planar f32. Mono and stereo are
/// kept as-is; anything wider is downmixed to stereo.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    /// Create a new decoder
    pub fn new() -> Self {
        Self
    }

    /// Decode a full file held in memory
    ///
    /// # Errors
    /// Fails on empty input, unrecognised containers, files without an
    /// audio track, unsupported codecs and files that decode to nothing.
    pub fn decode_bytes(&self, bytes: &[u8], extension: Option<&str>) -> Result<SampleBuffer> {
        if bytes.is_empty() {
            return Err(AudioError::DecodeError("input is empty".to_string()));
        }

        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

        // Create a hint to help the format registry guess the format
        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::UnsupportedFormat(format!("failed to probe input: {e}")))?;

        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| AudioError::DecodeError("no audio tracks found".to_string()))?;

        let track_id = track.id;
        let declared_rate = track.codec_params.sample_rate;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Symphonia(format!("failed to create decoder: {e}")))?;

        let mut channels: Vec<Vec<f32>> = Vec::new();
        let mut sample_rate = declared_rate.unwrap_or(0);
        let mut skipped_packets = 0usize;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                // Chained streams change parameters mid-file; keep what was decoded so far
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => {
                    return Err(AudioError::Symphonia(format!("error reading packet: {e}")));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    skipped_packets += 1;
                    warn!(error = %e, "skipping corrupt packet");
                    continue;
                }
                Err(SymphoniaError::IoError(e)) => {
                    skipped_packets += 1;
                    warn!(error = %e, "skipping unreadable packet");
                    continue;
                }
                Err(e) => return Err(AudioError::DecodeError(e.to_string())),
            };

            if sample_rate == 0 {
                sample_rate = decoded.spec().rate;
            }
            Self::append_planar(&decoded, &mut channels);
        }

        let frames = channels.first().map_or(0, Vec::len);
        if frames == 0 {
            return Err(AudioError::DecodeError("no audio frames decoded".to_string()));
        }
        if sample_rate == 0 {
            return Err(AudioError::DecodeError("unknown sample rate".to_string()));
        }

        debug!(
            frames,
            channels = channels.len(),
            sample_rate,
            skipped_packets,
            "decoded audio"
        );

        SampleBuffer::new(channels, SampleRate::new(sample_rate))
            .map_err(|e| AudioError::InvalidBuffer(e.to_string()))
    }

    /// Convert one decoded packet to f32 and append it channel by channel
    fn append_planar(decoded: &AudioBufferRef<'_>, channels: &mut Vec<Vec<f32>>) {
        let mut converted: AudioBuffer<f32> = decoded.make_equivalent();
        decoded.convert(&mut converted);

        let source_channels = converted.spec().channels.count();
        if source_channels == 0 {
            return;
        }

        let output_channels = source_channels.min(2);
        if channels.is_empty() {
            channels.resize_with(output_channels, Vec::new);
        }

        // Packets must agree with the first one on layout
        if channels.len() != output_channels {
            warn!(
                expected = channels.len(),
                got = output_channels,
                "channel layout changed mid-stream, packet dropped"
            );
            return;
        }

        match source_channels {
            1 | 2 => {
                for (ch, out) in channels.iter_mut().enumerate() {
                    out.extend(converted.chan(ch).iter().map(|s| s.clamp(-1.0, 1.0)));
                }
            }
            _ => {
                let (left, right) = Self::downmix_to_stereo(&converted, source_channels);
                channels[0].extend(left);
                channels[1].extend(right);
            }
        }
    }

    /// Downmix 3+ channels to stereo with ITU-R BS.775-1 coefficients
    ///
    /// - L_out = L + 0.707*C + 0.707*Ls
    /// - R_out = R + 0.707*C + 0.707*Rs
    ///
    /// Layouts: 3 = (L, R, C), 4 = (L, R, SL, SR), 5 = (L, R, C, SL, SR),
    /// 6+ = (L, R, C, LFE, SL, SR, ...), extra channels ignored.
    fn downmix_to_stereo(buf: &AudioBuffer<f32>, channels: usize) -> (Vec<f32>, Vec<f32>) {
        let frames = buf.frames();
        let silent = vec![0.0f32; frames];
        let chan = |i: usize| if i < channels { buf.chan(i) } else { &silent[..] };

        let left = chan(0);
        let right = chan(1);
        let (center, lfe, surround_left, surround_right) = match channels {
            3 => (chan(2), &silent[..], &silent[..], &silent[..]),
            4 => (&silent[..], &silent[..], chan(2), chan(3)),
            5 => (chan(2), &silent[..], chan(3), chan(4)),
            _ => (chan(2), chan(3), chan(4), chan(5)),
        };

        let mut out_left = Vec::with_capacity(frames);
        let mut out_right = Vec::with_capacity(frames);
        for i in 0..frames {
            let shared = (center[i] + lfe[i]) * CENTER_MIX;
            out_left.push((left[i] + shared + surround_left[i] * CENTER_MIX).clamp(-1.0, 1.0));
            out_right.push((right[i] + shared + surround_right[i] * CENTER_MIX).clamp(-1.0, 1.0));
        }
        (out_left, out_right)
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, bytes: &[u8], hint: Option<&str>) -> lofi_core::Result<SampleBuffer> {
        Ok(self.decode_bytes(bytes, hint)?)
    }
}
