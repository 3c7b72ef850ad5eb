//! Per-stem effect settings: three-band EQ, compressor and reverb.
//!
//! These are parameter records only. The offline renderer in
//! `stemstudio-export` turns them into DSP.

use serde::{Deserialize, Serialize};

/// Three-band equaliser: low shelf, peaking mid at 1 kHz, high shelf.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqSettings {
    /// Low shelf gain in dB (-12 to +12).
    pub low_gain_db: f32,
    /// Mid peaking gain in dB (-12 to +12).
    pub mid_gain_db: f32,
    /// High shelf gain in dB (-12 to +12).
    pub high_gain_db: f32,
    /// Low shelf corner frequency in Hz.
    pub low_freq_hz: f32,
    /// High shelf corner frequency in Hz.
    pub high_freq_hz: f32,
}

impl Default for EqSettings {
    fn default() -> Self {
        Self::with_gains(0.0, 0.0, 0.0)
    }
}

impl EqSettings {
    /// Centre frequency of the peaking mid band.
    pub const MID_FREQ_HZ: f32 = 1000.0;
    pub const MID_Q: f32 = 1.0;
    pub const GAIN_RANGE_DB: f32 = 12.0;

    fn with_gains(low: f32, mid: f32, high: f32) -> Self {
        Self {
            low_gain_db: low,
            mid_gain_db: mid,
            high_gain_db: high,
            low_freq_hz: 320.0,
            high_freq_hz: 3200.0,
        }
    }

    /// Whether every band is at 0 dB.
    pub fn is_flat(&self) -> bool {
        self.low_gain_db == 0.0 && self.mid_gain_db == 0.0 && self.high_gain_db == 0.0
    }

    fn clamped(mut self) -> Self {
        let r = Self::GAIN_RANGE_DB;
        self.low_gain_db = self.low_gain_db.clamp(-r, r);
        self.mid_gain_db = self.mid_gain_db.clamp(-r, r);
        self.high_gain_db = self.high_gain_db.clamp(-r, r);
        self.low_freq_hz = self.low_freq_hz.clamp(20.0, 20_000.0);
        self.high_freq_hz = self.high_freq_hz.clamp(20.0, 20_000.0);
        self
    }
}

/// Downward compressor with a soft knee.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressorSettings {
    /// Threshold in dBFS (-100 to 0).
    pub threshold_db: f32,
    /// Compression ratio (1 to 20).
    pub ratio: f32,
    /// Attack in seconds.
    pub attack_secs: f32,
    /// Release in seconds.
    pub release_secs: f32,
    /// Knee width in dB (0 to 40).
    pub knee_db: f32,
    pub enabled: bool,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            threshold_db: -24.0,
            ratio: 4.0,
            attack_secs: 0.003,
            release_secs: 0.25,
            knee_db: 30.0,
            enabled: false,
        }
    }
}

impl CompressorSettings {
    fn clamped(mut self) -> Self {
        self.threshold_db = self.threshold_db.clamp(-100.0, 0.0);
        self.ratio = self.ratio.clamp(1.0, 20.0);
        self.attack_secs = self.attack_secs.clamp(0.0, 1.0);
        self.release_secs = self.release_secs.clamp(0.0, 1.0);
        self.knee_db = self.knee_db.clamp(0.0, 40.0);
        self
    }
}

/// Algorithmic reverb send.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbSettings {
    /// Dry/wet balance, 0 = dry, 1 = wet.
    pub wet_dry: f32,
    /// Decay time in seconds (0.1 to 10).
    pub decay_secs: f32,
    pub enabled: bool,
}

impl Default for ReverbSettings {
    fn default() -> Self {
        Self {
            wet_dry: 0.3,
            decay_secs: 2.0,
            enabled: false,
        }
    }
}

impl ReverbSettings {
    fn clamped(mut self) -> Self {
        self.wet_dry = self.wet_dry.clamp(0.0, 1.0);
        self.decay_secs = self.decay_secs.clamp(0.1, 10.0);
        self
    }
}

/// Complete effect chain for one stem, applied in order EQ → compressor → reverb.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StemEffects {
    pub eq: EqSettings,
    pub compressor: CompressorSettings,
    pub reverb: ReverbSettings,
}

impl StemEffects {
    /// Whether the chain leaves the signal untouched.
    pub fn is_bypassed(&self) -> bool {
        self.eq.is_flat() && !self.compressor.enabled && !self.reverb.enabled
    }

    /// Merge a partial update, clamping every parameter to its range.
    pub fn apply(&mut self, update: EffectsUpdate) {
        if let Some(eq) = update.eq {
            self.eq = eq.clamped();
        }
        if let Some(compressor) = update.compressor {
            self.compressor = compressor.clamped();
        }
        if let Some(reverb) = update.reverb {
            self.reverb = reverb.clamped();
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Partial replacement of a stem's effect chain. `None` leaves a section unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsUpdate {
    pub eq: Option<EqSettings>,
    pub compressor: Option<CompressorSettings>,
    pub reverb: Option<ReverbSettings>,
}

impl From<StemEffects> for EffectsUpdate {
    fn from(effects: StemEffects) -> Self {
        Self {
            eq: Some(effects.eq),
            compressor: Some(effects.compressor),
            reverb: Some(effects.reverb),
        }
    }
}

/// Named EQ curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqPreset {
    Flat,
    Warm,
    Bright,
    BassBoost,
    VocalPresence,
    Scoop,
}

impl EqPreset {
    pub const ALL: [EqPreset; 6] = [
        Self::Flat,
        Self::Warm,
        Self::Bright,
        Self::BassBoost,
        Self::VocalPresence,
        Self::Scoop,
    ];

    pub fn settings(self) -> EqSettings {
        match self {
            Self::Flat => EqSettings::with_gains(0.0, 0.0, 0.0),
            Self::Warm => EqSettings::with_gains(3.0, -1.0, -2.0),
            Self::Bright => EqSettings::with_gains(-2.0, 0.0, 4.0),
            Self::BassBoost => EqSettings::with_gains(6.0, 0.0, 0.0),
            Self::VocalPresence => EqSettings::with_gains(-2.0, 3.0, 2.0),
            Self::Scoop => EqSettings::with_gains(3.0, -4.0, 3.0),
        }
    }
}

/// Named compressor settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressorPreset {
    Off,
    Gentle,
    Moderate,
    Heavy,
    Vocals,
    Drums,
}

impl CompressorPreset {
    pub fn settings(self) -> CompressorSettings {
        let on = |threshold_db, ratio, attack_secs, release_secs, knee_db| CompressorSettings {
            threshold_db,
            ratio,
            attack_secs,
            release_secs,
            knee_db,
            enabled: true,
        };
        match self {
            Self::Off => CompressorSettings::default(),
            Self::Gentle => on(-20.0, 2.0, 0.01, 0.3, 30.0),
            Self::Moderate => on(-24.0, 4.0, 0.003, 0.25, 20.0),
            Self::Heavy => on(-30.0, 8.0, 0.001, 0.1, 10.0),
            Self::Vocals => on(-18.0, 3.0, 0.005, 0.2, 25.0),
            Self::Drums => on(-20.0, 6.0, 0.001, 0.15, 15.0),
        }
    }
}

/// Named reverb spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReverbPreset {
    Off,
    Room,
    Hall,
    Plate,
    Ambient,
}

impl ReverbPreset {
    pub fn settings(self) -> ReverbSettings {
        let (wet_dry, decay_secs, enabled) = match self {
            Self::Off => (0.0, 2.0, false),
            Self::Room => (0.2, 0.8, true),
            Self::Hall => (0.35, 2.5, true),
            Self::Plate => (0.4, 1.5, true),
            Self::Ambient => (0.5, 4.0, true),
        };
        ReverbSettings {
            wet_dry,
            decay_secs,
            enabled,
        }
    }
}
