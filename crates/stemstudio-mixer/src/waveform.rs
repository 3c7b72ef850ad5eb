//! Peak data for drawing stem lanes.

use serde::{Deserialize, Serialize};
use stemstudio_core::AudioBuffer;

/// Amplitude range covered by one horizontal pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakPair {
    pub min: f32,
    pub max: f32,
}

impl PeakPair {
    pub fn magnitude(&self) -> f32 {
        self.max.abs().max(self.min.abs())
    }
}

/// Min/max peaks of a stem's mono mixdown at a fixed pixel width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StemPeaks {
    pub peaks: Vec<PeakPair>,
    /// Source frames summarised by each pixel.
    pub frames_per_pixel: usize,
    pub sample_rate: u32,
}

impl StemPeaks {
    /// Summarise `buffer` into at most `width_px` peak pairs.
    pub fn from_buffer(buffer: &AudioBuffer, width_px: usize) -> Self {
        let mono = buffer.mono();
        let frames_per_pixel = if width_px == 0 {
            mono.len().max(1)
        } else {
            mono.len().div_ceil(width_px).max(1)
        };
        Self::from_mono(&mono, frames_per_pixel, buffer.sample_rate())
    }

    pub fn from_mono(samples: &[f32], frames_per_pixel: usize, sample_rate: u32) -> Self {
        let frames_per_pixel = frames_per_pixel.max(1);
        let peaks = samples
            .chunks(frames_per_pixel)
            .map(|chunk| {
                chunk.iter().fold(
                    PeakPair {
                        min: f32::MAX,
                        max: f32::MIN,
                    },
                    |acc, &s| PeakPair {
                        min: acc.min.min(s),
                        max: acc.max.max(s),
                    },
                )
            })
            .collect();
        Self {
            peaks,
            frames_per_pixel,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// Scale so the loudest pixel reaches ±1. Silent input is left as is.
    pub fn normalized(&self) -> Self {
        let loudest = self.peaks.iter().map(PeakPair::magnitude).fold(0.0, f32::max);
        if loudest <= f32::EPSILON {
            return self.clone();
        }
        Self {
            peaks: self
                .peaks
                .iter()
                .map(|p| PeakPair {
                    min: p.min / loudest,
                    max: p.max / loudest,
                })
                .collect(),
            ..*self
        }
    }

    /// RMS of the per-pixel peak magnitudes over `[start, end)`.
    pub fn rms_range(&self, start: usize, end: usize) -> f32 {
        let end = end.min(self.peaks.len());
        let start = start.min(end);
        if start == end {
            return 0.0;
        }
        let sum: f64 = self.peaks[start..end]
            .iter()
            .map(|p| (p.magnitude() as f64).powi(2))
            .sum();
        (sum / (end - start) as f64).sqrt() as f32
    }

    /// Pixel index for a time in seconds.
    pub fn pixel_at(&self, secs: f64) -> usize {
        (secs.max(0.0) * self.sample_rate as f64 / self.frames_per_pixel as f64) as usize
    }
}
