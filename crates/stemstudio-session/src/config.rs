//! Studio configuration file.

use crate::error::{SessionError, SessionResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use stemstudio_cache::CacheConfig;
use stemstudio_export::ExportSettings;
use stemstudio_gestures::GestureConfig;
use stemstudio_mixer::MixerConfig;

/// Every tunable of a studio session. Missing sections and fields fall
/// back to their defaults, so `{}` is a valid file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub cache: CacheConfig,
    pub gestures: GestureConfig,
    pub mixer: MixerConfig,
    /// MP3 bitrate for exports.
    pub mp3_bitrate_kbps: u32,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            gestures: GestureConfig::default(),
            mixer: MixerConfig::default(),
            mp3_bitrate_kbps: ExportSettings::default().mp3_bitrate_kbps,
        }
    }
}

impl StudioConfig {
    pub fn from_json(json: &str) -> SessionResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> SessionResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> SessionResult<()> {
        self.gestures
            .validate()
            .map_err(|e| SessionError::Config(e.to_string()))?;
        if self.cache.max_entries == 0 {
            return Err(SessionError::Config("cache.max_entries must be positive".into()));
        }
        if self.mp3_bitrate_kbps == 0 {
            return Err(SessionError::Config("mp3_bitrate_kbps must be positive".into()));
        }
        if self.mixer.sample_rate == 0 {
            return Err(SessionError::Config("mixer.sample_rate must be positive".into()));
        }
        Ok(())
    }

    /// Export settings follow the mixer: same rate, same output ceiling.
    pub fn export_settings(&self) -> ExportSettings {
        ExportSettings {
            sample_rate: self.mixer.sample_rate,
            mp3_bitrate_kbps: self.mp3_bitrate_kbps,
            limiter_threshold: self
                .mixer
                .limiter
                .enabled
                .then_some(self.mixer.limiter.threshold),
        }
    }
}
