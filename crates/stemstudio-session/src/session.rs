//! One open studio project.
//!
//! A session ties the pieces together: project metadata from the
//! [`MetadataStore`], stem state and transport in a [`MixCoordinator`],
//! decoded audio from the shared [`BufferCache`], exports through a
//! [`MixExportPipeline`] and timeline navigation through a
//! [`TouchGestureController`]. Stems are keyed by their track's UUID.

use crate::config::StudioConfig;
use crate::error::{SessionError, SessionResult};
use crate::model::{StudioProject, StudioTrack, TrackVersion};
use crate::store::MetadataStore;
use std::sync::Arc;
use stemstudio_cache::BufferCache;
use stemstudio_core::SharedBuffer;
use stemstudio_export::{
    ExportFormat, ExportProgress, MixArtifact, MixExportPipeline, OfflineRenderer,
};
use stemstudio_gestures::{
    Gesture, Gestures, PointerEvent, SharedFeedback, TouchGestureController,
};
use stemstudio_mixer::{MixCoordinator, PlaybackEngine, RenderReport, StemState};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of [`StudioSession::load_stems`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: usize,
    /// Stems whose audio could not be fetched or decoded, with the user-facing reason.
    pub failed: Vec<(String, String)>,
}

fn stem_id(track_id: Uuid) -> String {
    track_id.to_string()
}

fn stem_for_track(track: &StudioTrack) -> StemState {
    let mut stem = StemState::new(stem_id(track.id), track.track_type.clone())
        .with_name(track.name.clone())
        .with_volume(track.volume)
        .with_pan(track.pan)
        .with_muted(track.muted)
        .with_solo(track.solo);
    if let Some(url) = track.source_url() {
        stem = stem.with_source(url);
    }
    if let Some(clip) = track.primary_clip() {
        stem.offset_secs = clip.start_secs;
        stem.trim_start_secs = clip.trim_start_secs;
        stem.duration_secs = clip.duration_secs.max(0.0);
    }
    stem
}

pub struct StudioSession {
    project: StudioProject,
    store: Arc<dyn MetadataStore>,
    cache: BufferCache,
    mixer: MixCoordinator,
    engine: PlaybackEngine,
    exporter: MixExportPipeline,
    gestures: TouchGestureController,
}

impl StudioSession {
    /// Load `project_id` and build the mix from its tracks.
    pub async fn open(
        project_id: Uuid,
        store: Arc<dyn MetadataStore>,
        cache: BufferCache,
        config: &StudioConfig,
    ) -> SessionResult<Self> {
        config.validate()?;
        let project = store.load_project(project_id).await?;

        let mut mixer =
            MixCoordinator::with_stems(config.mixer, project.tracks.iter().map(stem_for_track))?;
        mixer.set_master_volume(project.master_volume);
        mixer.set_duration(project.duration_secs);

        let renderer = Arc::new(OfflineRenderer::new(cache.clone()));
        let exporter = MixExportPipeline::new(renderer, config.export_settings());

        info!(
            project_id = %project.id,
            name = %project.name,
            tracks = project.tracks.len(),
            duration_secs = mixer.duration(),
            "Studio session opened"
        );

        Ok(Self {
            project,
            store,
            cache,
            engine: PlaybackEngine::new(config.mixer.sample_rate),
            mixer,
            exporter,
            gestures: TouchGestureController::new(config.gestures),
        })
    }

    /// Route gesture haptics to the host shell.
    pub fn with_feedback(mut self, feedback: SharedFeedback) -> Self {
        let config = *self.gestures.config();
        self.gestures = TouchGestureController::new(config).with_feedback(feedback);
        self
    }

    pub fn project(&self) -> &StudioProject {
        &self.project
    }

    pub fn mixer(&self) -> &MixCoordinator {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut MixCoordinator {
        &mut self.mixer
    }

    pub fn gestures(&self) -> &TouchGestureController {
        &self.gestures
    }

    pub fn gestures_mut(&mut self) -> &mut TouchGestureController {
        &mut self.gestures
    }

    pub fn cache(&self) -> &BufferCache {
        &self.cache
    }

    // ── Audio ──────────────────────────────────────────────────

    /// Queue every playable stem for background decoding, vocals first.
    pub fn preload_stems(&self) -> usize {
        let sources: Vec<String> = self
            .mixer
            .stems()
            .iter()
            .filter_map(|s| s.source.clone())
            .collect();
        self.cache.preload(sources)
    }

    /// Decoded audio for one track. The stem's length is taken from the
    /// decoded audio when the project did not know it, or when the clip
    /// claims more than the audio holds.
    pub async fn load_stem(&mut self, track_id: Uuid) -> SessionResult<SharedBuffer> {
        let id = stem_id(track_id);
        let stem = self
            .mixer
            .stem(&id)
            .ok_or(SessionError::TrackNotFound(track_id))?;
        let source = stem
            .source
            .clone()
            .ok_or_else(|| SessionError::Store(format!("track {track_id} has no audio yet")))?;
        let known_duration = stem.duration_secs;
        let trim = stem.trim_start_secs;

        let buffer = self.cache.fetch_and_decode(&source).await?;
        let available = (buffer.duration_secs() - trim).max(0.0);
        if known_duration <= 0.0 || known_duration > available {
            debug!(
                stem_id = %id,
                known_duration,
                available,
                "Stem length taken from decoded audio"
            );
            self.mixer.set_stem_duration(&id, available)?;
        }
        Ok(buffer)
    }

    /// Fetch and decode every playable stem now. Failures are collected,
    /// not propagated, so one bad stem does not block the rest.
    pub async fn load_stems(&mut self) -> LoadReport {
        let playable: Vec<Uuid> = self
            .project
            .tracks
            .iter()
            .filter(|t| t.source_url().is_some())
            .map(|t| t.id)
            .collect();

        let mut report = LoadReport::default();
        for track_id in playable {
            match self.load_stem(track_id).await {
                Ok(_) => report.loaded += 1,
                Err(e) => {
                    warn!(%track_id, error = %e, "Stem failed to load");
                    let reason = match &e {
                        SessionError::Cache(cache) => cache.user_message().to_string(),
                        other => other.to_string(),
                    };
                    report.failed.push((stem_id(track_id), reason));
                }
            }
        }
        report
    }

    /// Render one block of live playback at the transport position.
    ///
    /// Audible stems whose buffers are no longer cached play silent for
    /// this block and are queued for background re-decoding, so they come
    /// back once the preload lands.
    pub fn render_block(&mut self, out: &mut [f32]) -> RenderReport {
        let report = self.engine.render(&self.mixer, &self.cache, out);
        if !report.unresolved.is_empty() {
            let sources: Vec<String> = report
                .unresolved
                .iter()
                .filter_map(|id| self.mixer.stem(id).and_then(|s| s.source.clone()))
                .collect();
            let queued = self.cache.preload(sources);
            debug!(
                unresolved = report.unresolved.len(),
                queued,
                "Re-queued stems missing from the cache"
            );
        }
        report
    }

    // ── Tracks ─────────────────────────────────────────────────

    pub async fn add_track(&mut self, track: StudioTrack) -> SessionResult<Uuid> {
        self.mixer.add_stem(stem_for_track(&track))?;
        let id = self.project.add_track(track);
        self.store.save_project(&self.project).await?;
        Ok(id)
    }

    pub async fn remove_track(&mut self, track_id: Uuid) -> SessionResult<StudioTrack> {
        let track = self
            .project
            .remove_track(track_id)
            .ok_or(SessionError::TrackNotFound(track_id))?;
        self.mixer.remove_stem(&stem_id(track_id))?;
        self.store.save_project(&self.project).await?;
        Ok(track)
    }

    /// Link a generated version into a track slot and make it the one that
    /// plays. The change is persisted immediately.
    pub async fn link_track_version(
        &mut self,
        track_id: Uuid,
        version: TrackVersion,
    ) -> SessionResult<()> {
        let track = self
            .project
            .track_mut(track_id)
            .ok_or(SessionError::TrackNotFound(track_id))?;
        let label = version.label.clone();
        track.add_version(version);
        track.set_active_version(&label);
        let track = track.clone();

        self.sync_stem_source(&track)?;
        self.store.update_track(self.project.id, &track).await?;
        info!(%track_id, label = %label, "Linked track version");
        Ok(())
    }

    /// Resolve the pending track waiting on a generation task.
    pub async fn resolve_pending(
        &mut self,
        task_id: &str,
        versions: Vec<TrackVersion>,
    ) -> SessionResult<Option<Uuid>> {
        let Some(track_id) = self.project.resolve_pending(task_id, versions) else {
            debug!(task_id, "No pending track for task");
            return Ok(None);
        };
        let track = self
            .project
            .track(track_id)
            .cloned()
            .ok_or(SessionError::TrackNotFound(track_id))?;
        self.sync_stem_source(&track)?;
        self.store.update_track(self.project.id, &track).await?;
        Ok(Some(track_id))
    }

    fn sync_stem_source(&mut self, track: &StudioTrack) -> SessionResult<()> {
        let id = stem_id(track.id);
        self.mixer
            .set_stem_source(&id, track.source_url().map(str::to_string))?;
        if let Some(clip) = track.primary_clip() {
            self.mixer.set_stem_duration(&id, clip.duration_secs.max(0.0))?;
        }
        Ok(())
    }

    /// Write the live mix state back into the project and persist it.
    pub async fn save(&mut self) -> SessionResult<()> {
        for track in &mut self.project.tracks {
            if let Some(stem) = self.mixer.stem(&stem_id(track.id)) {
                track.volume = stem.volume();
                track.pan = stem.pan();
                track.muted = stem.muted();
                track.solo = stem.solo();
            }
        }
        self.project.master_volume = self.mixer.transport().master_volume();
        self.project.revision += 1;
        self.store.save_project(&self.project).await?;
        debug!(project_id = %self.project.id, revision = self.project.revision, "Project saved");
        Ok(())
    }

    // ── Export ─────────────────────────────────────────────────

    /// Export the current mix. Later edits do not affect a running export.
    pub async fn export(
        &self,
        format: ExportFormat,
        on_progress: impl Fn(ExportProgress) + Send + Sync + 'static,
    ) -> SessionResult<MixArtifact> {
        let snapshot = self.mixer.snapshot();
        Ok(self.exporter.export_mix(&snapshot, format, on_progress).await?)
    }

    pub fn cancel_export(&self) -> bool {
        self.exporter.cancel_export()
    }

    pub fn is_exporting(&self) -> bool {
        self.exporter.is_exporting()
    }

    /// Download name for an exported mix of this project.
    pub fn download_name(&self, artifact: &MixArtifact) -> String {
        artifact.file_name(&self.project.name)
    }

    // ── Timeline navigation ────────────────────────────────────

    /// Project time under horizontal screen position `x`.
    pub fn timeline_time(&self, x: f32, pixels_per_second: f32) -> f64 {
        let scale = pixels_per_second * self.gestures.zoom();
        if scale <= 0.0 {
            return 0.0;
        }
        (((x - self.gestures.pan().x) / scale) as f64).max(0.0)
    }

    /// Feed a pointer event to the gesture controller. A tap seeks to the
    /// tapped time and a double tap toggles playback.
    pub fn handle_pointer(&mut self, event: PointerEvent, pixels_per_second: f32) -> Gestures {
        let gestures = self.gestures.handle(event);
        for gesture in &gestures {
            match *gesture {
                Gesture::Tap { position } => {
                    let time = self.timeline_time(position.x, pixels_per_second);
                    self.mixer.seek(time);
                }
                Gesture::DoubleTap { .. } => self.mixer.toggle_play_pause(),
                _ => {}
            }
        }
        gestures
    }

    /// Cancel any running export and persist the mix.
    pub async fn close(mut self) -> SessionResult<()> {
        self.cancel_export();
        self.save().await?;
        info!(project_id = %self.project.id, "Studio session closed");
        Ok(())
    }
}
