//! Mix rendering: the renderer seam and the local offline implementation.

use crate::dsp::EffectChain;
use crate::encode::encode;
use crate::error::{ExportError, ExportResult};
use crate::format::{ExportFormat, ExportSettings};
use crate::progress::{ExportStage, ProgressReporter};
use async_trait::async_trait;
use stemstudio_cache::BufferCache;
use stemstudio_core::{AudioBuffer, SharedBuffer};
use stemstudio_mixer::{pan_gains, MixSnapshot, StemSnapshot};
use tracing::{debug, info};

/// Everything a renderer needs: the audible stems only, with solo already
/// resolved, plus master and output settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MixSpec {
    pub stems: Vec<StemSnapshot>,
    pub master_volume: f32,
    /// Project length; 0 derives it from the decoded stems.
    pub duration_secs: f64,
    pub settings: ExportSettings,
}

impl MixSpec {
    /// Keep only active stems from a snapshot.
    pub fn from_snapshot(snapshot: &MixSnapshot, settings: ExportSettings) -> Self {
        Self {
            stems: snapshot.active_stems().cloned().collect(),
            master_volume: snapshot.master_volume,
            duration_secs: snapshot.duration_secs,
            settings,
        }
    }
}

/// Encoded output of a renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMix {
    pub bytes: Vec<u8>,
    pub duration_secs: f64,
}

/// Produces encoded audio for a mix. Implementations report progress and
/// honour cancellation at their checkpoints.
#[async_trait]
pub trait MixRenderer: Send + Sync {
    async fn render(
        &self,
        spec: &MixSpec,
        format: ExportFormat,
        progress: &ProgressReporter,
    ) -> ExportResult<RenderedMix>;
}

/// Renders locally from buffers resolved through the shared cache.
#[derive(Debug, Clone)]
pub struct OfflineRenderer {
    cache: BufferCache,
}

impl OfflineRenderer {
    pub fn new(cache: BufferCache) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl MixRenderer for OfflineRenderer {
    async fn render(
        &self,
        spec: &MixSpec,
        format: ExportFormat,
        progress: &ProgressReporter,
    ) -> ExportResult<RenderedMix> {
        let settings = spec.settings;
        let total = spec.stems.len().max(1);

        let mut loaded: Vec<(StemSnapshot, SharedBuffer)> = Vec::with_capacity(spec.stems.len());
        for (i, stem) in spec.stems.iter().enumerate() {
            progress.checkpoint()?;
            let Some(source) = stem.source.as_deref() else {
                continue;
            };
            let buffer = self.cache.fetch_and_decode(source).await?;
            loaded.push((stem.clone(), buffer));
            progress.report_with(
                ExportStage::LoadingStems,
                (i + 1) as f32 / total as f32,
                format!("Loading stems ({}/{})", i + 1, spec.stems.len()),
            );
        }

        let duration_secs = if spec.duration_secs > 0.0 {
            spec.duration_secs
        } else {
            loaded
                .iter()
                .map(|(stem, buffer)| stem_end_secs(stem, buffer))
                .fold(0.0, f64::max)
        };
        let total_frames = (duration_secs * settings.sample_rate as f64).ceil() as usize;
        if total_frames == 0 {
            return Err(ExportError::Render("mix has zero length".into()));
        }
        info!(
            stems = loaded.len(),
            duration_secs,
            sample_rate = settings.sample_rate,
            %format,
            "Rendering mix"
        );

        let mut mix = vec![0.0f32; total_frames * 2];
        let stem_count = loaded.len().max(1);
        for (i, (stem, buffer)) in loaded.into_iter().enumerate() {
            progress.checkpoint()?;
            let sample_rate = settings.sample_rate;
            let stem_id = stem.stem_id.clone();
            let rendered = tokio::task::spawn_blocking(move || {
                render_stem(&stem, &buffer, sample_rate, total_frames)
            })
            .await
            .map_err(|e| ExportError::Render(format!("stem render task failed: {e}")))?;
            for (dst, src) in mix.iter_mut().zip(&rendered) {
                *dst += src;
            }
            debug!(stem_id = %stem_id, "Stem rendered");
            progress.report(ExportStage::Processing, (i + 1) as f32 / stem_count as f32);
        }

        progress.checkpoint()?;
        progress.report(ExportStage::Finalizing, 1.0);
        apply_master(&mut mix, spec.master_volume, settings.limiter_threshold);

        progress.checkpoint()?;
        progress.report(ExportStage::Encoding, 1.0);
        let bytes = tokio::task::spawn_blocking(move || encode(format, &mix, &settings))
            .await
            .map_err(|e| ExportError::Encode(format!("encoder task failed: {e}")))??;

        Ok(RenderedMix {
            bytes,
            duration_secs,
        })
    }
}

/// Timeline position where a stem's audio runs out.
fn stem_end_secs(stem: &StemSnapshot, buffer: &AudioBuffer) -> f64 {
    let available = (buffer.duration_secs() - stem.trim_start_secs).max(0.0);
    let length = if stem.duration_secs > 0.0 {
        stem.duration_secs.min(available)
    } else {
        available
    };
    stem.offset_secs + length
}

/// Place one stem on the timeline at `sample_rate`, run its effects and apply
/// gain and pan. Returns `total_frames` interleaved stereo frames.
pub fn render_stem(
    stem: &StemSnapshot,
    buffer: &AudioBuffer,
    sample_rate: u32,
    total_frames: usize,
) -> Vec<f32> {
    let mut out = vec![0.0f32; total_frames * 2];
    let rate = sample_rate as f64;
    let ratio = buffer.sample_rate() as f64 / rate;
    let first = ((stem.offset_secs * rate).max(0.0) as usize).min(total_frames);
    let last = ((stem_end_secs(stem, buffer) * rate).ceil() as usize).min(total_frames);

    for frame in first..last {
        let source_pos = (frame as f64 / rate - stem.offset_secs + stem.trim_start_secs)
            * rate
            * ratio;
        let index = source_pos.floor() as usize;
        let frac = (source_pos - index as f64) as f32;
        let Some((l0, r0)) = buffer.stereo_frame(index) else {
            break;
        };
        let (l1, r1) = buffer.stereo_frame(index + 1).unwrap_or((l0, r0));
        out[frame * 2] = l0 + (l1 - l0) * frac;
        out[frame * 2 + 1] = r0 + (r1 - r0) * frac;
    }

    let mut chain = EffectChain::new(&stem.effects, sample_rate);
    if !chain.is_bypassed() {
        chain.process(&mut out[first * 2..]);
    }

    let (gain_l, gain_r) = pan_gains(stem.pan, stem.gain);
    for frame in out.chunks_exact_mut(2) {
        frame[0] *= gain_l;
        frame[1] *= gain_r;
    }
    out
}

/// Master gain, then a hard ceiling. Output is always within ±1.
pub fn apply_master(mix: &mut [f32], master_volume: f32, limiter_threshold: Option<f32>) {
    let ceiling = limiter_threshold.map_or(1.0, |t| t.clamp(0.0, 1.0));
    for sample in mix.iter_mut() {
        *sample = (*sample * master_volume).clamp(-ceiling, ceiling);
    }
}
