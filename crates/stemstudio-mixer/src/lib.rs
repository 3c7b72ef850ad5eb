//! Stem Studio Mixer - multi-stem mix coordination
//!
//! Architecture:
//! - `StemState`: per-stem volume/pan/mute/solo and effect settings
//! - `MixCoordinator`: solo-aware audibility, effective gain, transport, snapshots
//! - `TransportState`: stopped/paused/playing clock with clamped seek
//! - `PlaybackEngine`: block renderer reading buffers through `BufferLookup`
//! - `StemPeaks`: waveform peaks for stem lanes

pub mod config;
pub mod coordinator;
pub mod effects;
pub mod engine;
pub mod error;
pub mod events;
pub mod presets;
pub mod sort;
pub mod stem;
pub mod transport;
pub mod waveform;

pub use config::{LimiterConfig, MixerConfig, SoloMode};
pub use coordinator::{MixCoordinator, MixSnapshot, StemSnapshot};
pub use effects::{
    CompressorPreset, CompressorSettings, EffectsUpdate, EqPreset, EqSettings, ReverbPreset,
    ReverbSettings, StemEffects,
};
pub use engine::{PlaybackEngine, RenderReport};
pub use error::{MixError, MixResult};
pub use events::{MixEvent, SubscriptionId};
pub use presets::{builtin_presets, find_preset, MixPreset, PresetRule, StemPresetSettings};
pub use sort::{is_vocal_type, sort_by_type};
pub use stem::{pan_gains, StemState};
pub use transport::{PlaybackState, TransportState};
pub use waveform::{PeakPair, StemPeaks};
