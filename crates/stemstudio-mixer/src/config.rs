//! Mixer configuration.

use serde::{Deserialize, Serialize};

/// How enabling solo on one stem affects the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoloMode {
    /// Any number of stems may be soloed at once.
    #[default]
    Additive,
    /// Soloing a stem clears solo on every other stem.
    Exclusive,
}

/// Output limiter applied after master volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    pub enabled: bool,
    /// Ceiling in linear amplitude.
    pub threshold: f32,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: 0.95,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    pub solo_mode: SoloMode,
    /// Master volume for new sessions, in [0, 1].
    pub default_master_volume: f32,
    /// Output sample rate for playback and export.
    pub sample_rate: u32,
    pub limiter: LimiterConfig,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            solo_mode: SoloMode::Additive,
            default_master_volume: 0.85,
            sample_rate: 44_100,
            limiter: LimiterConfig::default(),
        }
    }
}
