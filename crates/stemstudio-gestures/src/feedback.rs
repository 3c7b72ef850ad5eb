//! Host feedback seam.
//!
//! The embedding shell decides what a "tap" feels like. Calls are
//! fire-and-forget: nothing the sink does can alter gesture state.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Haptic {
    /// Light tick for taps, seeks and toggles.
    Tap,
    /// Selection change, e.g. a swipe between pages.
    Selection,
    /// Stronger pulse for long press.
    Impact,
    /// Zoom hit its limit.
    Boundary,
}

pub trait FeedbackSink: Send + Sync {
    fn haptic(&self, kind: Haptic);
}

/// Sink that drops everything, used when no host is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFeedback;

impl FeedbackSink for NoFeedback {
    fn haptic(&self, _kind: Haptic) {}
}

pub type SharedFeedback = Arc<dyn FeedbackSink>;
