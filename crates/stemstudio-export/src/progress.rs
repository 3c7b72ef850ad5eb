//! Export progress reporting and cancellation.

use crate::error::{ExportError, ExportResult};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Phase of an export, each owning a slice of the 0..100 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    LoadingStems,
    Processing,
    Finalizing,
    Encoding,
    Done,
}

impl ExportStage {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::LoadingStems => "Loading stems",
            Self::Processing => "Processing audio",
            Self::Finalizing => "Finalizing mix",
            Self::Encoding => "Encoding",
            Self::Done => "Done",
        }
    }

    /// Percent range covered by this stage.
    fn range(self) -> (u8, u8) {
        match self {
            Self::LoadingStems => (0, 30),
            Self::Processing => (40, 80),
            Self::Finalizing => (85, 85),
            Self::Encoding => (95, 95),
            Self::Done => (100, 100),
        }
    }

    /// Percent for a fraction (0.0..=1.0) of this stage.
    pub fn percent(self, fraction: f32) -> u8 {
        let (start, end) = self.range();
        let span = (end - start) as f32;
        start + (span * fraction.clamp(0.0, 1.0)).round() as u8
    }
}

/// Progress update delivered to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportProgress {
    /// 0 to 100.
    pub percent: u8,
    pub stage: ExportStage,
    /// Human-readable stage text.
    pub message: String,
}

/// Handle for cancelling an in-progress export.
#[derive(Debug, Clone)]
pub struct ExportCancel(Arc<AtomicBool>);

impl ExportCancel {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Whether both handles control the same export.
    pub fn same_export(&self, other: &ExportCancel) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Default for ExportCancel {
    fn default() -> Self {
        Self::new()
    }
}

type ProgressFn = dyn Fn(ExportProgress) + Send + Sync;

/// Forwards monotonic progress to a callback until the export is cancelled.
pub struct ProgressReporter {
    callback: Box<ProgressFn>,
    cancel: ExportCancel,
    last_percent: AtomicU8,
}

impl ProgressReporter {
    pub fn new(cancel: ExportCancel, callback: impl Fn(ExportProgress) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
            cancel,
            last_percent: AtomicU8::new(0),
        }
    }

    /// A reporter that discards updates.
    pub fn silent(cancel: ExportCancel) -> Self {
        Self::new(cancel, |_| {})
    }

    /// Report progress within a stage. Dropped once cancelled; never goes backwards.
    pub fn report(&self, stage: ExportStage, fraction: f32) {
        self.report_with(stage, fraction, stage.display_name().to_string());
    }

    pub fn report_with(&self, stage: ExportStage, fraction: f32, message: String) {
        if self.cancel.is_cancelled() {
            return;
        }
        let percent = stage.percent(fraction);
        let previous = self.last_percent.fetch_max(percent, Ordering::Relaxed);
        if percent < previous {
            return;
        }
        (self.callback)(ExportProgress {
            percent,
            stage,
            message,
        });
    }

    /// Cancellation checkpoint.
    pub fn checkpoint(&self) -> ExportResult<()> {
        if self.cancel.is_cancelled() {
            Err(ExportError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("last_percent", &self.last_percent.load(Ordering::Relaxed))
            .finish()
    }
}
