//! Stem Studio Session - one open project
//!
//! Architecture:
//! - `model`: persisted project / track / clip / version metadata
//! - `MetadataStore`: CRUD seam onto the external store, with in-memory and JSON directory backends
//! - `StudioConfig`: cache, gesture and mixer settings loaded from JSON
//! - `StudioSession`: builds the mix from a project and wires cache, export and gestures

pub mod config;
pub mod error;
pub mod model;
pub mod session;
pub mod store;

pub use config::StudioConfig;
pub use error::{SessionError, SessionResult};
pub use model::{
    StudioClip, StudioProject, StudioTrack, TrackStatus, TrackVersion, DEFAULT_CLIP_DURATION_SECS,
};
pub use session::{LoadReport, StudioSession};
pub use store::{InMemoryStore, JsonDirStore, MetadataStore};
