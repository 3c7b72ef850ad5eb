//! Project, track and clip metadata.
//!
//! This is the persisted shape of a studio project. Mix state that lives
//! while a session is open is held by the mixer and written back on save.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Clip length used when the generator did not report one.
pub const DEFAULT_CLIP_DURATION_SECS: f64 = 180.0;

/// Generation state of a track's audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    #[default]
    Ready,
    /// Waiting for a generation task to produce audio.
    Pending,
    Processing,
    Failed,
}

/// A placed region of audio on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudioClip {
    pub id: Uuid,
    pub audio_url: String,
    pub name: String,
    /// Timeline position in seconds.
    #[serde(default)]
    pub start_secs: f64,
    #[serde(default = "default_clip_duration")]
    pub duration_secs: f64,
    #[serde(default)]
    pub trim_start_secs: f64,
    #[serde(default)]
    pub trim_end_secs: f64,
    #[serde(default)]
    pub fade_in_secs: f64,
    #[serde(default)]
    pub fade_out_secs: f64,
}

fn default_clip_duration() -> f64 {
    DEFAULT_CLIP_DURATION_SECS
}

impl StudioClip {
    pub fn new(name: impl Into<String>, audio_url: impl Into<String>, duration_secs: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            audio_url: audio_url.into(),
            name: name.into(),
            start_secs: 0.0,
            duration_secs,
            trim_start_secs: 0.0,
            trim_end_secs: 0.0,
            fade_in_secs: 0.0,
            fade_out_secs: 0.0,
        }
    }

    pub fn end_secs(&self) -> f64 {
        self.start_secs + self.duration_secs
    }
}

/// One generated take of a track, labelled `A`, `B`, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackVersion {
    pub label: String,
    pub audio_url: String,
    #[serde(default)]
    pub duration_secs: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudioTrack {
    pub id: Uuid,
    pub name: String,
    /// Stem type such as `vocals`, `drums` or `main`.
    #[serde(rename = "type")]
    pub track_type: String,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub pan: f32,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub solo: bool,
    #[serde(default)]
    pub clips: Vec<StudioClip>,
    #[serde(default)]
    pub status: TrackStatus,
    /// Generation task that will resolve a pending track.
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub versions: Vec<TrackVersion>,
    #[serde(default)]
    pub active_version: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

fn default_volume() -> f32 {
    1.0
}

impl StudioTrack {
    pub fn new(name: impl Into<String>, track_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            track_type: track_type.into(),
            audio_url: None,
            volume: default_volume(),
            pan: 0.0,
            muted: false,
            solo: false,
            clips: Vec::new(),
            status: TrackStatus::Ready,
            task_id: None,
            versions: Vec::new(),
            active_version: None,
            error_message: None,
        }
    }

    /// Attach audio as a single clip at the start of the timeline.
    pub fn with_audio(mut self, audio_url: impl Into<String>, duration_secs: Option<f64>) -> Self {
        let audio_url = audio_url.into();
        self.clips = vec![StudioClip::new(
            self.name.clone(),
            audio_url.clone(),
            duration_secs.unwrap_or(DEFAULT_CLIP_DURATION_SECS),
        )];
        self.audio_url = Some(audio_url);
        self
    }

    /// Placeholder for audio that a generation task has yet to deliver.
    pub fn pending(
        name: impl Into<String>,
        track_type: impl Into<String>,
        task_id: impl Into<String>,
    ) -> Self {
        let mut track = Self::new(name, track_type);
        track.status = TrackStatus::Pending;
        track.task_id = Some(task_id.into());
        track
    }

    pub fn primary_clip(&self) -> Option<&StudioClip> {
        self.clips.first()
    }

    /// Audio to play, only once the track is ready.
    pub fn source_url(&self) -> Option<&str> {
        if self.status != TrackStatus::Ready {
            return None;
        }
        self.primary_clip()
            .map(|c| c.audio_url.as_str())
            .or(self.audio_url.as_deref())
            .filter(|url| !url.is_empty())
    }

    pub fn version(&self, label: &str) -> Option<&TrackVersion> {
        self.versions.iter().find(|v| v.label == label)
    }

    /// Record a version. The track's current audio becomes version `A` the
    /// first time a version is added. An existing label is replaced.
    pub fn add_version(&mut self, version: TrackVersion) {
        if self.versions.is_empty() {
            if let Some(url) = self.audio_url.clone().filter(|u| u != &version.audio_url) {
                self.versions.push(TrackVersion {
                    label: "A".into(),
                    audio_url: url,
                    duration_secs: self.primary_clip().map(|c| c.duration_secs),
                });
            }
        }
        match self.versions.iter_mut().find(|v| v.label == version.label) {
            Some(existing) => *existing = version,
            None => self.versions.push(version),
        }
    }

    /// Switch playback to a recorded version. Returns `false` for an unknown label.
    pub fn set_active_version(&mut self, label: &str) -> bool {
        let Some(version) = self.version(label).cloned() else {
            return false;
        };
        self.use_audio(&version.audio_url, version.duration_secs);
        self.active_version = Some(version.label);
        true
    }

    /// Point the track and its first clip at `audio_url`, creating the clip
    /// when the track had none.
    fn use_audio(&mut self, audio_url: &str, duration_secs: Option<f64>) {
        self.audio_url = Some(audio_url.to_string());
        match self.clips.first_mut() {
            Some(clip) => {
                clip.audio_url = audio_url.to_string();
                if let Some(duration) = duration_secs {
                    clip.duration_secs = duration;
                }
            }
            None => self.clips.push(StudioClip::new(
                self.name.clone(),
                audio_url,
                duration_secs.unwrap_or(DEFAULT_CLIP_DURATION_SECS),
            )),
        }
        self.status = TrackStatus::Ready;
        self.error_message = None;
    }

    /// Resolve a pending track with the versions its task produced. The
    /// first version becomes active.
    pub fn resolve(&mut self, versions: Vec<TrackVersion>) {
        let first = versions.first().cloned();
        self.versions = versions;
        match first {
            Some(version) => {
                self.use_audio(&version.audio_url, version.duration_secs);
                self.active_version = Some(version.label);
            }
            None => self.status = TrackStatus::Ready,
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = TrackStatus::Failed;
        self.error_message = Some(message.into());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudioProject {
    pub id: Uuid,
    pub name: String,
    #[serde(default = "default_bpm")]
    pub bpm: f32,
    #[serde(default)]
    pub key_signature: Option<String>,
    #[serde(default = "default_master_volume")]
    pub master_volume: f32,
    /// Explicit project length. When absent the furthest clip end is used.
    #[serde(default)]
    pub duration_secs: Option<f64>,
    #[serde(default)]
    pub tracks: Vec<StudioTrack>,
    /// Bumped on every save.
    #[serde(default)]
    pub revision: u64,
}

fn default_bpm() -> f32 {
    120.0
}

fn default_master_volume() -> f32 {
    0.85
}

impl StudioProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            bpm: default_bpm(),
            key_signature: None,
            master_volume: default_master_volume(),
            duration_secs: None,
            tracks: Vec::new(),
            revision: 0,
        }
    }

    /// Project opened from an existing song: one `main` track holding it.
    pub fn from_source(
        name: impl Into<String>,
        audio_url: impl Into<String>,
        duration_secs: Option<f64>,
    ) -> Self {
        let mut project = Self::new(name);
        project.duration_secs = duration_secs;
        project.add_track(StudioTrack::new("Main Track", "main").with_audio(audio_url, duration_secs));
        project
    }

    pub fn add_track(&mut self, track: StudioTrack) -> Uuid {
        let id = track.id;
        self.tracks.push(track);
        id
    }

    pub fn remove_track(&mut self, id: Uuid) -> Option<StudioTrack> {
        let index = self.tracks.iter().position(|t| t.id == id)?;
        Some(self.tracks.remove(index))
    }

    pub fn track(&self, id: Uuid) -> Option<&StudioTrack> {
        self.tracks.iter().find(|t| t.id == id)
    }

    pub fn track_mut(&mut self, id: Uuid) -> Option<&mut StudioTrack> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    /// Resolve the pending track waiting on `task_id`. Returns its id.
    pub fn resolve_pending(&mut self, task_id: &str, versions: Vec<TrackVersion>) -> Option<Uuid> {
        let track = self.tracks.iter_mut().find(|t| {
            t.status == TrackStatus::Pending && t.task_id.as_deref() == Some(task_id)
        })?;
        track.resolve(versions);
        Some(track.id)
    }

    /// Explicit duration, else the end of the furthest clip.
    pub fn duration(&self) -> f64 {
        self.duration_secs.unwrap_or_else(|| {
            self.tracks
                .iter()
                .flat_map(|t| t.clips.iter())
                .map(StudioClip::end_secs)
                .fold(0.0, f64::max)
        })
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
