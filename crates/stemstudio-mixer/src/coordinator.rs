//! Mix coordination: stem set, solo resolution, transport and snapshots.

use crate::config::{MixerConfig, SoloMode};
use crate::effects::EffectsUpdate;
use crate::error::{MixError, MixResult};
use crate::events::{MixEvent, SubscriptionId, Subscribers};
use crate::presets::MixPreset;
use crate::sort::sort_by_type;
use crate::stem::StemState;
use crate::transport::{PlaybackState, TransportState};
use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Resolved parameters of one stem at export time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StemSnapshot {
    pub stem_id: String,
    /// Cache key of the stem audio.
    pub source: Option<String>,
    /// Stem volume after mute/solo resolution. Master volume is not included.
    pub gain: f32,
    /// `true` when muted explicitly or silenced by another stem's solo.
    pub muted: bool,
    pub pan: f32,
    pub offset_secs: f64,
    pub trim_start_secs: f64,
    pub duration_secs: f64,
    pub effects: crate::effects::StemEffects,
}

impl StemSnapshot {
    /// Audible and backed by audio.
    pub fn is_active(&self) -> bool {
        !self.muted && self.source.is_some()
    }
}

/// Immutable copy of the mix, decoupled from later edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixSnapshot {
    pub stems: Vec<StemSnapshot>,
    pub master_volume: f32,
    pub duration_secs: f64,
}

impl MixSnapshot {
    pub fn active_stems(&self) -> impl Iterator<Item = &StemSnapshot> {
        self.stems.iter().filter(|s| s.is_active())
    }

    pub fn has_active_stems(&self) -> bool {
        self.active_stems().next().is_some()
    }
}

/// Owns the stem states and transport of one studio session.
#[derive(Debug)]
pub struct MixCoordinator {
    config: MixerConfig,
    /// Kept in display order.
    stems: Vec<StemState>,
    transport: TransportState,
    /// Project duration overriding the one derived from stems.
    explicit_duration: Option<f64>,
    subscribers: Subscribers,
}

impl MixCoordinator {
    pub fn new(config: MixerConfig) -> Self {
        Self {
            transport: TransportState::new(config.default_master_volume),
            config,
            stems: Vec::new(),
            explicit_duration: None,
            subscribers: Subscribers::default(),
        }
    }

    pub fn with_stems(
        config: MixerConfig,
        stems: impl IntoIterator<Item = StemState>,
    ) -> MixResult<Self> {
        let mut coordinator = Self::new(config);
        for stem in stems {
            coordinator.add_stem(stem)?;
        }
        Ok(coordinator)
    }

    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    // ── Stems ──────────────────────────────────────────────────

    pub fn add_stem(&mut self, stem: StemState) -> MixResult<()> {
        if self.stem(&stem.id).is_some() {
            return Err(MixError::DuplicateStem(stem.id));
        }
        debug!(stem_id = %stem.id, stem_type = %stem.stem_type, "Adding stem");
        self.stems.push(stem);
        sort_by_type(&mut self.stems, |s| s.stem_type.as_str());
        self.refresh_duration();
        Ok(())
    }

    pub fn remove_stem(&mut self, stem_id: &str) -> MixResult<StemState> {
        let index = self.index_of(stem_id)?;
        let stem = self.stems.remove(index);
        self.refresh_duration();
        self.emit_audibility();
        Ok(stem)
    }

    /// Stems in display order: vocals first, then by type priority.
    pub fn stems(&self) -> &[StemState] {
        &self.stems
    }

    pub fn stem(&self, stem_id: &str) -> Option<&StemState> {
        self.stems.iter().find(|s| s.id == stem_id)
    }

    fn index_of(&self, stem_id: &str) -> MixResult<usize> {
        self.stems
            .iter()
            .position(|s| s.id == stem_id)
            .ok_or_else(|| MixError::UnknownStem(stem_id.to_string()))
    }

    fn stem_mut(&mut self, stem_id: &str) -> MixResult<&mut StemState> {
        let index = self.index_of(stem_id)?;
        Ok(&mut self.stems[index])
    }

    pub fn set_volume(&mut self, stem_id: &str, volume: f32) -> MixResult<f32> {
        let stem = self.stem_mut(stem_id)?;
        stem.set_volume(volume);
        let volume = stem.volume();
        self.subscribers.emit(MixEvent::StemChanged(stem_id.to_string()));
        Ok(volume)
    }

    pub fn set_pan(&mut self, stem_id: &str, pan: f32) -> MixResult<f32> {
        let stem = self.stem_mut(stem_id)?;
        stem.set_pan(pan);
        let pan = stem.pan();
        self.subscribers.emit(MixEvent::StemChanged(stem_id.to_string()));
        Ok(pan)
    }

    /// Flip mute. Returns the new mute flag.
    pub fn toggle_mute(&mut self, stem_id: &str) -> MixResult<bool> {
        let stem = self.stem_mut(stem_id)?;
        let muted = !stem.muted();
        stem.set_muted(muted);
        debug!(stem_id, muted, "Toggled mute");
        self.emit_audibility();
        Ok(muted)
    }

    /// Flip solo. In exclusive mode, enabling solo clears it everywhere else.
    /// Returns the new solo flag.
    pub fn toggle_solo(&mut self, stem_id: &str) -> MixResult<bool> {
        let index = self.index_of(stem_id)?;
        let solo = !self.stems[index].solo();
        if solo && self.config.solo_mode == SoloMode::Exclusive {
            for stem in &mut self.stems {
                stem.set_solo(false);
            }
        }
        self.stems[index].set_solo(solo);
        debug!(stem_id, solo, "Toggled solo");
        self.emit_audibility();
        Ok(solo)
    }

    pub fn update_effects(&mut self, stem_id: &str, update: EffectsUpdate) -> MixResult<()> {
        self.stem_mut(stem_id)?.effects.apply(update);
        self.subscribers.emit(MixEvent::StemChanged(stem_id.to_string()));
        Ok(())
    }

    pub fn reset_effects(&mut self, stem_id: &str) -> MixResult<()> {
        self.stem_mut(stem_id)?.effects.reset();
        self.subscribers.emit(MixEvent::StemChanged(stem_id.to_string()));
        Ok(())
    }

    /// Record a stem's audible length once its audio has been decoded.
    pub fn set_stem_duration(&mut self, stem_id: &str, duration_secs: f64) -> MixResult<()> {
        if !duration_secs.is_finite() || duration_secs < 0.0 {
            return Err(MixError::InvalidParameter(format!(
                "stem duration must be non-negative, got {duration_secs}"
            )));
        }
        self.stem_mut(stem_id)?.duration_secs = duration_secs;
        self.refresh_duration();
        Ok(())
    }

    /// Point a stem at new audio, e.g. after a generated version lands.
    /// The previous decoded length no longer applies and is cleared.
    pub fn set_stem_source(&mut self, stem_id: &str, source: Option<String>) -> MixResult<()> {
        let stem = self.stem_mut(stem_id)?;
        stem.source = source;
        stem.duration_secs = 0.0;
        self.refresh_duration();
        self.subscribers.emit(MixEvent::StemChanged(stem_id.to_string()));
        self.emit_audibility();
        Ok(())
    }

    // ── Audibility ─────────────────────────────────────────────

    pub fn has_solo(&self) -> bool {
        self.stems.iter().any(|s| s.solo())
    }

    /// Solo-aware audibility. Unknown stems are inaudible.
    pub fn is_audible(&self, stem_id: &str) -> bool {
        let any_solo = self.has_solo();
        self.stem(stem_id).is_some_and(|s| s.is_audible(any_solo))
    }

    /// Audibility of every stem, in display order.
    pub fn audibility(&self) -> Vec<(String, bool)> {
        let any_solo = self.has_solo();
        self.stems
            .iter()
            .map(|s| (s.id.clone(), s.is_audible(any_solo)))
            .collect()
    }

    /// `volume × master_volume` when audible, otherwise 0. Unknown stems are 0.
    pub fn effective_gain(&self, stem_id: &str) -> f32 {
        let any_solo = self.has_solo();
        match self.stem(stem_id) {
            Some(stem) if stem.is_audible(any_solo) => {
                stem.volume() * self.transport.master_volume()
            }
            _ => 0.0,
        }
    }

    fn emit_audibility(&mut self) {
        if !self.subscribers.is_empty() {
            let audibility = self.audibility();
            self.subscribers.emit(MixEvent::Audibility(audibility));
        }
    }

    // ── Transport ──────────────────────────────────────────────

    pub fn transport(&self) -> &TransportState {
        &self.transport
    }

    pub fn play(&mut self) {
        self.transport.play();
        info!(current_time = self.transport.current_time(), "Playback started");
        self.emit_transport();
    }

    pub fn pause(&mut self) {
        self.transport.pause();
        self.emit_transport();
    }

    pub fn stop(&mut self) {
        self.transport.stop();
        info!("Playback stopped");
        self.emit_transport();
    }

    pub fn toggle_play_pause(&mut self) {
        if self.transport.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Clamp to `[0, duration]`. Playback state is unchanged.
    pub fn seek(&mut self, time: f64) -> f64 {
        let time = self.transport.seek(time);
        self.subscribers.emit(MixEvent::Seeked(time));
        time
    }

    pub fn set_master_volume(&mut self, volume: f32) -> f32 {
        self.transport.set_master_volume(volume);
        let volume = self.transport.master_volume();
        self.subscribers.emit(MixEvent::MasterVolume(volume));
        volume
    }

    /// Advance the playback clock. Emits `Ended` when the end is reached.
    pub fn advance(&mut self, dt_secs: f64) -> bool {
        let ended = self.transport.advance(dt_secs);
        if ended {
            info!(duration = self.transport.duration(), "Playback ended");
            self.emit_transport();
            self.subscribers.emit(MixEvent::Ended);
        }
        ended
    }

    fn emit_transport(&mut self) {
        self.subscribers.emit(MixEvent::Transport {
            state: self.transport.state(),
            current_time: self.transport.current_time(),
        });
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.transport.state()
    }

    /// Explicit project duration; `None` derives it from the stems.
    pub fn set_duration(&mut self, duration: Option<f64>) {
        self.explicit_duration = duration.filter(|d| d.is_finite() && *d >= 0.0);
        self.refresh_duration();
    }

    pub fn duration(&self) -> f64 {
        self.transport.duration()
    }

    fn refresh_duration(&mut self) {
        let duration = self.explicit_duration.unwrap_or_else(|| {
            self.stems
                .iter()
                .map(StemState::end_secs)
                .fold(0.0, f64::max)
        });
        if duration != self.transport.duration() {
            self.transport.set_duration(duration);
            self.subscribers.emit(MixEvent::DurationChanged(duration));
        }
    }

    /// Position inside a stem's source audio at the current transport time.
    pub fn stem_offset(&self, stem_id: &str) -> Option<f64> {
        self.stem(stem_id)?
            .source_position(self.transport.current_time())
    }

    // ── Presets and snapshots ──────────────────────────────────

    pub fn apply_preset(&mut self, preset: &MixPreset) {
        info!(preset = %preset.id, "Applying mix preset");
        for stem in &mut self.stems {
            let settings = preset.settings_for(&stem.stem_type);
            if let Some(volume) = settings.volume {
                stem.set_volume(volume);
            }
            if let Some(muted) = settings.muted {
                stem.set_muted(muted);
            }
            if let Some(effects) = settings.effects {
                stem.effects.apply(effects);
            }
        }
        if let Some(master) = preset.master_volume {
            self.set_master_volume(master);
        }
        self.emit_audibility();
        self.subscribers
            .emit(MixEvent::PresetApplied(preset.id.clone()));
    }

    /// Resolve solo into mute and freeze the current mix.
    pub fn snapshot(&self) -> MixSnapshot {
        let any_solo = self.has_solo();
        let stems = self
            .stems
            .iter()
            .map(|stem| {
                let audible = stem.is_audible(any_solo);
                StemSnapshot {
                    stem_id: stem.id.clone(),
                    source: stem.source.clone(),
                    gain: if audible { stem.volume() } else { 0.0 },
                    muted: !audible,
                    pan: stem.pan(),
                    offset_secs: stem.offset_secs,
                    trim_start_secs: stem.trim_start_secs,
                    duration_secs: stem.duration_secs,
                    effects: stem.effects,
                }
            })
            .collect();
        MixSnapshot {
            stems,
            master_volume: self.transport.master_volume(),
            duration_secs: self.transport.duration(),
        }
    }

    // ── Subscriptions ──────────────────────────────────────────

    pub fn subscribe(&mut self) -> (SubscriptionId, Receiver<MixEvent>) {
        self.subscribers.subscribe()
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}
