//! Transport state machine: stopped, paused, playing.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Paused,
    Playing,
}

/// Global playback clock for a studio session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportState {
    state: PlaybackState,
    current_time: f64,
    duration: f64,
    master_volume: f32,
}

impl TransportState {
    pub fn new(master_volume: f32) -> Self {
        let mut transport = Self {
            state: PlaybackState::Stopped,
            current_time: 0.0,
            duration: 0.0,
            master_volume: 1.0,
        };
        transport.set_master_volume(master_volume);
        transport
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Resumes from `current_time`.
    pub fn play(&mut self) {
        self.state = PlaybackState::Playing;
    }

    /// Only a playing transport pauses; stopped stays stopped.
    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.current_time = 0.0;
    }

    /// Clamp to `[0, duration]` without changing the playback state.
    pub fn seek(&mut self, time: f64) -> f64 {
        self.current_time = if time.is_nan() {
            0.0
        } else {
            time.clamp(0.0, self.duration)
        };
        self.current_time
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    /// Update the duration, pulling `current_time` back inside it.
    pub fn set_duration(&mut self, duration: f64) {
        self.duration = if duration.is_finite() {
            duration.max(0.0)
        } else {
            0.0
        };
        self.current_time = self.current_time.min(self.duration);
    }

    /// Move the clock forward while playing. Returns `true` when this step
    /// reached the end, which pauses the transport at `duration`.
    pub fn advance(&mut self, dt_secs: f64) -> bool {
        if self.state != PlaybackState::Playing || dt_secs.is_nan() || dt_secs <= 0.0 {
            return false;
        }
        self.current_time = (self.current_time + dt_secs).min(self.duration);
        if self.current_time >= self.duration {
            self.state = PlaybackState::Paused;
            return true;
        }
        false
    }
}
