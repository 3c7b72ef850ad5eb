//! Audio decoding into interleaved f32 PCM using symphonia.
//!
//! Handles every container/codec enabled on the workspace `symphonia`
//! dependency (MP3, WAV, FLAC, AAC/MP4, Vorbis).

use crate::error::{CacheError, CacheResult};
use stemstudio_core::AudioBuffer;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decodes a complete encoded payload into PCM.
pub trait AudioDecoder: Send + Sync {
    /// Fails with [`CacheError::Decode`] on malformed or unsupported audio.
    fn decode(&self, bytes: &[u8]) -> CacheResult<AudioBuffer>;
}

/// Decoder backed by symphonia's default format and codec registries.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, bytes: &[u8]) -> CacheResult<AudioBuffer> {
        let cursor = std::io::Cursor::new(bytes.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &Hint::new(),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| CacheError::Decode(format!("unrecognised format: {e}")))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| CacheError::Decode("no audio track found".into()))?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;
        let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| CacheError::Decode(format!("unsupported codec: {e}")))?;

        let mut samples: Vec<f32> = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(CacheError::Decode(format!("failed to read packet: {e}"))),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate.get_or_insert(spec.rate);
                    channels.get_or_insert(spec.channels.count() as u16);

                    let buf = sample_buf
                        .get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, spec));
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt packets are skipped
                    warn!("Skipping undecodable packet: {e}");
                }
                Err(e) => return Err(CacheError::Decode(e.to_string())),
            }
        }

        let sample_rate =
            sample_rate.ok_or_else(|| CacheError::Decode("sample rate not found".into()))?;
        let channels = channels.ok_or_else(|| CacheError::Decode("channel count not found".into()))?;
        if samples.is_empty() {
            return Err(CacheError::Decode("no audio samples decoded".into()));
        }

        debug!(
            sample_rate,
            channels,
            frames = samples.len() / channels.max(1) as usize,
            "Decoded audio"
        );
        AudioBuffer::from_samples(samples, sample_rate, channels)
            .map_err(|e| CacheError::Decode(e.to_string()))
    }
}
