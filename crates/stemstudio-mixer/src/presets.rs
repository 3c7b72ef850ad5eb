//! Named mix presets assigning settings per stem type.

use crate::effects::{
    CompressorPreset, EffectsUpdate, EqPreset, ReverbPreset, StemEffects,
};
use crate::sort::is_vocal_type;
use serde::{Deserialize, Serialize};

/// Settings a preset applies to matching stems. `None` leaves a value unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StemPresetSettings {
    pub volume: Option<f32>,
    pub muted: Option<bool>,
    pub effects: Option<EffectsUpdate>,
}

/// Settings for stems whose type matches `stem_type`. The target `vocal`
/// matches every vocal type; other targets match case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresetRule {
    pub stem_type: String,
    pub settings: StemPresetSettings,
}

impl PresetRule {
    fn matches(&self, stem_type: &str) -> bool {
        if self.stem_type.eq_ignore_ascii_case("vocal") {
            is_vocal_type(stem_type)
        } else {
            self.stem_type.eq_ignore_ascii_case(stem_type)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixPreset {
    pub id: String,
    pub name: String,
    /// First matching rule wins.
    pub rules: Vec<PresetRule>,
    /// Applied to stems no rule matches.
    #[serde(default)]
    pub fallback: StemPresetSettings,
    #[serde(default)]
    pub master_volume: Option<f32>,
}

impl MixPreset {
    pub fn settings_for(&self, stem_type: &str) -> StemPresetSettings {
        self.rules
            .iter()
            .find(|rule| rule.matches(stem_type))
            .map_or(self.fallback, |rule| rule.settings)
    }
}

fn rule(stem_type: &str, volume: f32, effects: Option<StemEffects>) -> PresetRule {
    PresetRule {
        stem_type: stem_type.to_string(),
        settings: StemPresetSettings {
            volume: Some(volume),
            muted: Some(false),
            effects: effects.map(EffectsUpdate::from),
        },
    }
}

fn chain(eq: EqPreset, compressor: CompressorPreset, reverb: ReverbPreset) -> Option<StemEffects> {
    Some(StemEffects {
        eq: eq.settings(),
        compressor: compressor.settings(),
        reverb: reverb.settings(),
    })
}

/// Presets offered by the studio.
pub fn builtin_presets() -> Vec<MixPreset> {
    let unmuted = |volume| StemPresetSettings {
        volume: Some(volume),
        muted: Some(false),
        effects: None,
    };

    vec![
        MixPreset {
            id: "balanced".into(),
            name: "Balanced".into(),
            rules: Vec::new(),
            fallback: StemPresetSettings {
                volume: Some(0.8),
                muted: Some(false),
                effects: Some(StemEffects::default().into()),
            },
            master_volume: Some(0.85),
        },
        MixPreset {
            id: "vocal_focus".into(),
            name: "Vocal Focus".into(),
            rules: vec![rule(
                "vocal",
                1.0,
                chain(EqPreset::VocalPresence, CompressorPreset::Vocals, ReverbPreset::Plate),
            )],
            fallback: unmuted(0.6),
            master_volume: None,
        },
        MixPreset {
            id: "karaoke".into(),
            name: "Karaoke".into(),
            rules: vec![PresetRule {
                stem_type: "vocal".into(),
                settings: StemPresetSettings {
                    muted: Some(true),
                    ..Default::default()
                },
            }],
            fallback: unmuted(0.9),
            master_volume: None,
        },
        MixPreset {
            id: "punchy".into(),
            name: "Punchy".into(),
            rules: vec![
                rule(
                    "drums",
                    1.0,
                    chain(EqPreset::Scoop, CompressorPreset::Drums, ReverbPreset::Room),
                ),
                rule(
                    "bass",
                    0.9,
                    chain(EqPreset::BassBoost, CompressorPreset::Moderate, ReverbPreset::Off),
                ),
            ],
            fallback: unmuted(0.75),
            master_volume: Some(0.9),
        },
        MixPreset {
            id: "ambient".into(),
            name: "Ambient".into(),
            rules: Vec::new(),
            fallback: StemPresetSettings {
                volume: Some(0.75),
                muted: Some(false),
                effects: chain(EqPreset::Warm, CompressorPreset::Gentle, ReverbPreset::Ambient)
                    .map(EffectsUpdate::from),
            },
            master_volume: Some(0.8),
        },
    ]
}

pub fn find_preset(id: &str) -> Option<MixPreset> {
    builtin_presets().into_iter().find(|p| p.id == id)
}
