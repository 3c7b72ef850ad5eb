//! Stem Studio Gestures - Touch navigation for the mix timeline
//!
//! Turns raw pointer streams into pinch zoom, pan, swipe, long press and
//! double tap. Zoom and pan offsets are owned by the controller; the host
//! reads them back and forwards seeks to the mix coordinator.

pub mod config;
pub mod controller;
pub mod feedback;

pub use config::{GestureConfig, GestureConfigError};
pub use controller::{
    Gesture, GestureListener, Gestures, PointerEvent, PointerId, PointerPhase, SwipeDirection,
    TouchGestureController,
};
pub use feedback::{FeedbackSink, Haptic, NoFeedback, SharedFeedback};

/// Re-exported so hosts can build pointer positions without naming glam.
pub use glam::Vec2;
