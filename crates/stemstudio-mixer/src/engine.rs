//! Block renderer for live playback.
//!
//! Pulls decoded buffers through [`BufferLookup`] on every block, so a stem
//! evicted mid-session goes silent until its buffer resolves again instead
//! of stalling the other stems.

use crate::coordinator::MixCoordinator;
use crate::stem::StemState;
use stemstudio_core::{AudioBuffer, BufferLookup};

/// What happened while rendering one block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderReport {
    pub frames: usize,
    /// Stems that contributed audio.
    pub mixed: usize,
    /// Audible stems whose buffer could not be resolved.
    pub unresolved: Vec<String>,
}

/// Mixes audible stems into interleaved stereo output.
#[derive(Debug)]
pub struct PlaybackEngine {
    sample_rate: u32,
    scratch: Vec<f32>,
}

impl PlaybackEngine {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            scratch: Vec::new(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Render `out.len() / 2` stereo frames starting at the transport's
    /// current time. Does not advance the transport.
    pub fn render(
        &mut self,
        mix: &MixCoordinator,
        buffers: &dyn BufferLookup,
        out: &mut [f32],
    ) -> RenderReport {
        let frames = out.len() / 2;
        let output_len = frames * 2;
        if self.scratch.len() < output_len {
            self.scratch.resize(output_len, 0.0);
        }
        self.scratch[..output_len].fill(0.0);

        let mut report = RenderReport {
            frames,
            ..Default::default()
        };
        let start_time = mix.transport().current_time();
        let any_solo = mix.has_solo();

        for stem in mix.stems() {
            if !stem.is_audible(any_solo) || stem.volume() == 0.0 {
                continue;
            }
            let Some(key) = stem.source.as_deref() else {
                continue;
            };
            let Some(buffer) = buffers.lookup(key) else {
                report.unresolved.push(stem.id.clone());
                continue;
            };

            self.mix_stem(stem, &buffer, start_time, frames);
            report.mixed += 1;
        }

        let master = mix.transport().master_volume();
        let limiter = mix.config().limiter;
        for (dst, &src) in out[..output_len].iter_mut().zip(&self.scratch[..output_len]) {
            let s = src * master;
            *dst = if limiter.enabled {
                s.clamp(-limiter.threshold, limiter.threshold)
            } else {
                s
            };
        }
        out[output_len..].fill(0.0);
        report
    }

    fn mix_stem(&mut self, stem: &StemState, buffer: &AudioBuffer, start_time: f64, frames: usize) {
        let (gain_l, gain_r) = stem.stereo_gain(stem.volume());
        let rate = self.sample_rate as f64;
        let src_rate = buffer.sample_rate() as f64;

        for frame in 0..frames {
            let Some(pos) = stem.source_position(start_time + frame as f64 / rate) else {
                continue;
            };
            let Some((l, r)) = sample_at(buffer, pos * src_rate) else {
                continue;
            };
            self.scratch[frame * 2] += l * gain_l;
            self.scratch[frame * 2 + 1] += r * gain_r;
        }
    }
}

/// Linear interpolation between the two frames around `position` (in frames).
fn sample_at(buffer: &AudioBuffer, position: f64) -> Option<(f32, f32)> {
    let index = position.floor() as usize;
    let frac = (position - index as f64) as f32;
    let (l0, r0) = buffer.stereo_frame(index)?;
    let (l1, r1) = buffer.stereo_frame(index + 1).unwrap_or((l0, r0));
    Some((l0 + (l1 - l0) * frac, r0 + (r1 - r0) * frac))
}
