//! Export orchestration: snapshot in, downloadable artifact out.

use crate::error::{ExportError, ExportResult};
use crate::format::{ExportFormat, ExportSettings, MixArtifact};
use crate::progress::{ExportCancel, ExportProgress, ExportStage, ProgressReporter};
use crate::render::{MixRenderer, MixSpec};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use stemstudio_mixer::MixSnapshot;
use tracing::{info, warn};

/// Drives one export at a time through a [`MixRenderer`].
pub struct MixExportPipeline {
    renderer: Arc<dyn MixRenderer>,
    settings: ExportSettings,
    active: Mutex<Option<ExportCancel>>,
}

impl MixExportPipeline {
    pub fn new(renderer: Arc<dyn MixRenderer>, settings: ExportSettings) -> Self {
        Self {
            renderer,
            settings,
            active: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Render and encode the audible stems of `snapshot`.
    ///
    /// Fails with [`ExportError::NoActiveStems`] before touching the renderer
    /// when nothing is audible. A cancelled export returns
    /// [`ExportError::Cancelled`] and discards whatever was rendered.
    pub async fn export_mix(
        &self,
        snapshot: &MixSnapshot,
        format: ExportFormat,
        on_progress: impl Fn(ExportProgress) + Send + Sync + 'static,
    ) -> ExportResult<MixArtifact> {
        if !snapshot.has_active_stems() {
            warn!("Export requested with no audible stems");
            return Err(ExportError::NoActiveStems);
        }

        let cancel = ExportCancel::new();
        if let Some(previous) = self.active.lock().replace(cancel.clone()) {
            previous.cancel();
        }

        let spec = MixSpec::from_snapshot(snapshot, self.settings);
        let reporter = ProgressReporter::new(cancel.clone(), on_progress);
        let started = Instant::now();
        info!(stems = spec.stems.len(), %format, "Starting mix export");

        let result = self.renderer.render(&spec, format, &reporter).await;
        self.clear_active(&cancel);

        let rendered = match result {
            _ if cancel.is_cancelled() => {
                info!("Mix export cancelled");
                return Err(ExportError::Cancelled);
            }
            Err(e) => {
                warn!(error = %e, "Mix export failed");
                return Err(e);
            }
            Ok(rendered) => rendered,
        };

        reporter.report(ExportStage::Done, 1.0);
        info!(
            size_bytes = rendered.bytes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Mix export complete"
        );
        Ok(MixArtifact {
            bytes: rendered.bytes,
            format,
            sample_rate: self.settings.sample_rate,
            duration_secs: rendered.duration_secs,
        })
    }

    /// Cancel the running export. Observed at its next progress checkpoint.
    pub fn cancel_export(&self) -> bool {
        match self.active.lock().take() {
            Some(cancel) => {
                cancel.cancel();
                info!("Mix export cancellation requested");
                true
            }
            None => false,
        }
    }

    pub fn is_exporting(&self) -> bool {
        self.active.lock().is_some()
    }

    fn clear_active(&self, cancel: &ExportCancel) {
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|c| c.same_export(cancel)) {
            *active = None;
        }
    }
}

impl std::fmt::Debug for MixExportPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixExportPipeline")
            .field("settings", &self.settings)
            .field("exporting", &self.is_exporting())
            .finish()
    }
}
