//! Per-stem mix parameters.

use crate::effects::StemEffects;
use serde::{Deserialize, Serialize};

/// Mutable mix state for one stem, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StemState {
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form stem type such as `vocals`, `drums` or `lead_vocal`.
    pub stem_type: String,
    /// Cache key of the stem audio. `None` until a source is attached.
    pub source: Option<String>,
    volume: f32,
    pan: f32,
    muted: bool,
    solo: bool,
    /// Position of the stem's first sample on the project timeline, in seconds.
    pub offset_secs: f64,
    /// Seconds skipped at the start of the source audio.
    pub trim_start_secs: f64,
    /// Audible length in seconds. Zero while unknown.
    pub duration_secs: f64,
    pub effects: StemEffects,
}

impl StemState {
    pub fn new(id: impl Into<String>, stem_type: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            stem_type: stem_type.into(),
            source: None,
            volume: 1.0,
            pan: 0.0,
            muted: false,
            solo: false,
            offset_secs: 0.0,
            trim_start_secs: 0.0,
            duration_secs: 0.0,
            effects: StemEffects::default(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_volume(mut self, volume: f32) -> Self {
        self.set_volume(volume);
        self
    }

    pub fn with_pan(mut self, pan: f32) -> Self {
        self.set_pan(pan);
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn with_solo(mut self, solo: bool) -> Self {
        self.solo = solo;
        self
    }

    pub fn with_duration(mut self, duration_secs: f64) -> Self {
        self.duration_secs = duration_secs.max(0.0);
        self
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Clamped to [0, 1]. Non-finite input is treated as 0.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    /// Clamped to [-1, 1]. Non-finite input centres the stem.
    pub fn set_pan(&mut self, pan: f32) {
        self.pan = if pan.is_finite() {
            pan.clamp(-1.0, 1.0)
        } else {
            0.0
        };
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn solo(&self) -> bool {
        self.solo
    }

    pub fn set_solo(&mut self, solo: bool) {
        self.solo = solo;
    }

    /// Audibility given whether any stem in the set is soloed.
    ///
    /// Mute always silences the stem itself, even when it is soloed.
    pub fn is_audible(&self, any_solo: bool) -> bool {
        !self.muted && (!any_solo || self.solo)
    }

    /// Timeline position where the stem stops sounding.
    pub fn end_secs(&self) -> f64 {
        self.offset_secs + self.duration_secs
    }

    /// Position inside the source audio for a project time, or `None` when
    /// the stem is not sounding at that time.
    pub fn source_position(&self, project_time: f64) -> Option<f64> {
        let local = project_time - self.offset_secs;
        if local < 0.0 || (self.duration_secs > 0.0 && local >= self.duration_secs) {
            return None;
        }
        Some(local + self.trim_start_secs)
    }

    /// Left/right gains for a linear `gain` using constant-power panning.
    pub fn stereo_gain(&self, gain: f32) -> (f32, f32) {
        pan_gains(self.pan, gain)
    }
}

/// Constant-power pan law: centre gives -3 dB per side.
pub fn pan_gains(pan: f32, gain: f32) -> (f32, f32) {
    let angle = (pan.clamp(-1.0, 1.0) + 1.0) * 0.25 * std::f32::consts::PI;
    (gain * angle.cos(), gain * angle.sin())
}
