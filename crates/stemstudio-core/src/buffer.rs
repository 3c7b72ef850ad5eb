//! Decoded PCM audio buffers.

use crate::cache_budget::BYTES_PER_SAMPLE;
use crate::error::{Result, StudioError};
use std::sync::Arc;

/// A decoded buffer shared between the cache and its readers.
pub type SharedBuffer = Arc<AudioBuffer>;

/// A buffer of decoded audio samples (interleaved f32).
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample data (interleaved: L, R, L, R, ...).
    samples: Vec<f32>,
    /// Sample rate in Hz.
    sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo).
    channels: u16,
}

impl AudioBuffer {
    /// Create from interleaved samples.
    ///
    /// Fails when the channel count or sample rate is zero, or when the
    /// sample count is not a whole number of frames.
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if channels == 0 {
            return Err(StudioError::InvalidParameter(
                "audio buffer needs at least one channel".into(),
            ));
        }
        if sample_rate == 0 {
            return Err(StudioError::InvalidParameter(
                "audio buffer sample rate must be positive".into(),
            ));
        }
        if samples.len() % channels as usize != 0 {
            return Err(StudioError::InvalidParameter(format!(
                "{} samples do not divide into {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// Create a silent buffer of the given duration.
    pub fn silence(duration_secs: f64, sample_rate: u32, channels: u16) -> Self {
        let frames = (duration_secs.max(0.0) * sample_rate as f64) as usize;
        Self {
            samples: vec![0.0; frames * channels as usize],
            sample_rate: sample_rate.max(1),
            channels: channels.max(1),
        }
    }

    /// Interleaved sample data.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of sample frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Memory held by the decoded samples: `frames × channels × 4`.
    pub fn size_bytes(&self) -> usize {
        self.frame_count() * self.channels as usize * BYTES_PER_SAMPLE
    }

    /// Stereo pair at `frame`. Mono buffers return the same value twice,
    /// extra channels beyond the first two are ignored.
    #[inline]
    pub fn stereo_frame(&self, frame: usize) -> Option<(f32, f32)> {
        let ch = self.channels as usize;
        let base = frame.checked_mul(ch)?;
        let left = *self.samples.get(base)?;
        let right = if ch > 1 { self.samples[base + 1] } else { left };
        Some((left, right))
    }

    /// Mono mixdown (average of all channels) for display purposes.
    pub fn mono(&self) -> Vec<f32> {
        let ch = self.channels as usize;
        self.samples
            .chunks_exact(ch)
            .map(|frame| frame.iter().sum::<f32>() / ch as f32)
            .collect()
    }
}

/// Read-only lookup of decoded buffers by source key.
///
/// Playback and rendering resolve stems through this seam so they never hold
/// buffers beyond the owner's eviction decisions.
pub trait BufferLookup {
    /// Resolve the buffer for `key`, or `None` when it is not loaded.
    fn lookup(&self, key: &str) -> Option<SharedBuffer>;
}

impl BufferLookup for std::collections::HashMap<String, SharedBuffer> {
    fn lookup(&self, key: &str) -> Option<SharedBuffer> {
        self.get(key).cloned()
    }
}
