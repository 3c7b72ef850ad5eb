//! Stem Studio Export - mix export pipeline
//!
//! Architecture:
//! - `MixExportPipeline`: fail-fast validation, progress, cancellation
//! - `MixRenderer`: seam onto the render/encode step
//! - `OfflineRenderer`: local render from cached buffers with per-stem effects
//! - `encode`: 16-bit WAV (hound) and MP3 (LAME)

pub mod dsp;
pub mod encode;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod progress;
pub mod render;

pub use dsp::EffectChain;
pub use error::{ExportError, ExportResult};
pub use format::{mix_file_name, ExportFormat, ExportSettings, MixArtifact};
pub use pipeline::MixExportPipeline;
pub use progress::{ExportCancel, ExportProgress, ExportStage, ProgressReporter};
pub use render::{MixRenderer, MixSpec, OfflineRenderer, RenderedMix};
