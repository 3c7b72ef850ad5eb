//! Gesture thresholds.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GestureConfigError {
    #[error("zoom bounds must satisfy 0 < min_zoom <= max_zoom, got [{min}, {max}]")]
    ZoomBounds { min: f32, max: f32 },

    #[error("{0} must be positive")]
    NonPositive(&'static str),
}

/// Distances are in pixels, durations in milliseconds, velocities in px/ms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Release speed along the dominant axis above which a drag is a swipe.
    pub swipe_velocity_threshold: f32,
    /// Displacement along the dominant axis a swipe must exceed.
    pub swipe_distance_threshold: f32,
    pub long_press_duration_ms: u64,
    /// Movement tolerated before a touch stops being a tap or long press.
    pub long_press_jitter: f32,
    pub double_tap_interval_ms: u64,
    pub double_tap_distance: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.5,
            max_zoom: 3.0,
            swipe_velocity_threshold: 0.5,
            swipe_distance_threshold: 50.0,
            long_press_duration_ms: 500,
            long_press_jitter: 10.0,
            double_tap_interval_ms: 300,
            double_tap_distance: 50.0,
        }
    }
}

impl GestureConfig {
    pub fn validate(&self) -> Result<(), GestureConfigError> {
        if !(self.min_zoom > 0.0 && self.min_zoom <= self.max_zoom) {
            return Err(GestureConfigError::ZoomBounds {
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }
        if self.swipe_velocity_threshold <= 0.0 {
            return Err(GestureConfigError::NonPositive("swipe_velocity_threshold"));
        }
        if self.long_press_duration_ms == 0 {
            return Err(GestureConfigError::NonPositive("long_press_duration_ms"));
        }
        Ok(())
    }

    pub fn long_press_duration(&self) -> Duration {
        Duration::from_millis(self.long_press_duration_ms)
    }

    pub fn double_tap_interval(&self) -> Duration {
        Duration::from_millis(self.double_tap_interval_ms)
    }

    /// Clamp a zoom factor into `[min_zoom, max_zoom]`.
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        if zoom.is_nan() {
            return self.min_zoom;
        }
        zoom.clamp(self.min_zoom, self.max_zoom)
    }
}
