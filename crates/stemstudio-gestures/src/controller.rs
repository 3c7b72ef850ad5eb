//! Pointer stream to semantic gesture recognition.
//!
//! The controller is a pure state machine: the host feeds it timestamped
//! pointer events and calls [`TouchGestureController::tick`] from its frame
//! loop so a long press can fire while the finger is still. Recognised
//! gestures come back as [`Gesture`] values which can be routed to a
//! [`GestureListener`] with named callbacks.

use crate::config::GestureConfig;
use crate::feedback::{Haptic, NoFeedback, SharedFeedback};
use glam::Vec2;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

pub type PointerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

/// One raw pointer sample. `time_ms` is a monotonic host timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub id: PointerId,
    pub phase: PointerPhase,
    pub position: Vec2,
    pub time_ms: u64,
}

impl PointerEvent {
    pub fn down(id: PointerId, position: Vec2, time_ms: u64) -> Self {
        Self::new(id, PointerPhase::Down, position, time_ms)
    }

    pub fn moved(id: PointerId, position: Vec2, time_ms: u64) -> Self {
        Self::new(id, PointerPhase::Move, position, time_ms)
    }

    pub fn up(id: PointerId, position: Vec2, time_ms: u64) -> Self {
        Self::new(id, PointerPhase::Up, position, time_ms)
    }

    pub fn cancel(id: PointerId, time_ms: u64) -> Self {
        Self::new(id, PointerPhase::Cancel, Vec2::ZERO, time_ms)
    }

    fn new(id: PointerId, phase: PointerPhase, position: Vec2, time_ms: u64) -> Self {
        Self {
            id,
            phase,
            position,
            time_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwipeDirection {
    Left,
    Right,
    Up,
    Down,
}

/// A recognised gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// Pinch changed the zoom factor. `zoom` is already clamped.
    Pinch { zoom: f32 },
    /// Single-finger drag moved by `delta`; `offset` is the accumulated pan.
    Pan { delta: Vec2, offset: Vec2 },
    /// A single-finger drag finished.
    PanEnd { offset: Vec2 },
    /// Two fingers moved together horizontally.
    TwoFingerPan { delta_x: f32, offset: Vec2 },
    /// Fast single-finger flick, reported once at release.
    Swipe {
        direction: SwipeDirection,
        velocity: f32,
    },
    LongPress { position: Vec2 },
    Tap { position: Vec2 },
    DoubleTap { position: Vec2 },
}

impl Gesture {
    pub fn dispatch(&self, listener: &mut dyn GestureListener) {
        match *self {
            Self::Pinch { zoom } => listener.on_pinch(zoom),
            Self::Pan { delta, offset } => listener.on_pan(delta, offset),
            Self::PanEnd { offset } => listener.on_pan_end(offset),
            Self::TwoFingerPan { delta_x, offset } => listener.on_two_finger_pan(delta_x, offset),
            Self::Swipe {
                direction,
                velocity,
            } => listener.on_swipe(direction, velocity),
            Self::LongPress { position } => listener.on_long_press(position),
            Self::Tap { position } => listener.on_tap(position),
            Self::DoubleTap { position } => listener.on_double_tap(position),
        }
    }
}

/// Named callbacks. Every method defaults to a no-op.
pub trait GestureListener {
    fn on_pinch(&mut self, _zoom: f32) {}
    fn on_pan(&mut self, _delta: Vec2, _offset: Vec2) {}
    fn on_pan_end(&mut self, _offset: Vec2) {}
    fn on_two_finger_pan(&mut self, _delta_x: f32, _offset: Vec2) {}
    fn on_swipe(&mut self, _direction: SwipeDirection, _velocity: f32) {}
    fn on_long_press(&mut self, _position: Vec2) {}
    fn on_tap(&mut self, _position: Vec2) {}
    fn on_double_tap(&mut self, _position: Vec2) {}
}

/// Gestures produced by one event; rarely more than two.
pub type Gestures = SmallVec<[Gesture; 2]>;

#[derive(Debug, Clone, Copy)]
struct Contact {
    id: PointerId,
    start: Vec2,
    position: Vec2,
    start_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mode {
    Idle,
    Single {
        moved: bool,
        long_pressed: bool,
    },
    Pinch {
        start_distance: f32,
        start_zoom: f32,
        last_center: Vec2,
    },
    /// A two-finger gesture ended with a finger still down. Nothing is
    /// recognised until every pointer lifts.
    Draining,
}

pub struct TouchGestureController {
    config: GestureConfig,
    contacts: SmallVec<[Contact; 2]>,
    mode: Mode,
    zoom: f32,
    pan: Vec2,
    last_tap: Option<(Vec2, u64)>,
    feedback: SharedFeedback,
}

impl fmt::Debug for TouchGestureController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TouchGestureController")
            .field("mode", &self.mode)
            .field("contacts", &self.contacts.len())
            .field("zoom", &self.zoom)
            .field("pan", &self.pan)
            .finish()
    }
}

impl TouchGestureController {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            zoom: config.clamp_zoom(1.0),
            config,
            contacts: SmallVec::new(),
            mode: Mode::Idle,
            pan: Vec2::ZERO,
            last_tap: None,
            feedback: Arc::new(NoFeedback),
        }
    }

    pub fn with_feedback(mut self, feedback: SharedFeedback) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn pan(&self) -> Vec2 {
        self.pan
    }

    /// Whether any pointer is down.
    pub fn is_active(&self) -> bool {
        !self.contacts.is_empty()
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = self.config.clamp_zoom(1.0);
        if let Mode::Pinch { start_zoom, .. } = &mut self.mode {
            *start_zoom = self.zoom;
        }
    }

    pub fn reset_pan(&mut self) {
        self.pan = Vec2::ZERO;
    }

    /// Set zoom from a non-touch control (buttons, wheel). Returns the clamped value.
    pub fn set_zoom(&mut self, zoom: f32) -> f32 {
        self.zoom = self.config.clamp_zoom(zoom);
        self.zoom
    }

    pub fn handle(&mut self, event: PointerEvent) -> Gestures {
        let mut out = Gestures::new();
        match event.phase {
            PointerPhase::Down => self.pointer_down(event, &mut out),
            PointerPhase::Move => self.pointer_move(event, &mut out),
            PointerPhase::Up => self.pointer_up(event, &mut out),
            PointerPhase::Cancel => self.cancel(),
        }
        out
    }

    /// Handle an event and route the result to `listener`.
    pub fn handle_with(&mut self, event: PointerEvent, listener: &mut dyn GestureListener) {
        for gesture in self.handle(event) {
            gesture.dispatch(listener);
        }
    }

    /// Fire a pending long press once its hold time has elapsed.
    pub fn tick(&mut self, now_ms: u64) -> Option<Gesture> {
        let Mode::Single {
            moved: false,
            long_pressed,
        } = &mut self.mode
        else {
            return None;
        };
        let contact = self.contacts.first()?;
        if *long_pressed
            || now_ms.saturating_sub(contact.start_ms) < self.config.long_press_duration_ms
        {
            return None;
        }
        *long_pressed = true;
        debug!(x = contact.start.x, y = contact.start.y, "Long press");
        self.feedback.haptic(Haptic::Impact);
        Some(Gesture::LongPress {
            position: contact.start,
        })
    }

    fn pointer_down(&mut self, event: PointerEvent, out: &mut Gestures) {
        if self.contacts.iter().any(|c| c.id == event.id) || self.contacts.len() >= 2 {
            return;
        }
        if matches!(self.mode, Mode::Draining) {
            return;
        }
        self.contacts.push(Contact {
            id: event.id,
            start: event.position,
            position: event.position,
            start_ms: event.time_ms,
        });

        if self.contacts.len() == 1 {
            self.mode = Mode::Single {
                moved: false,
                long_pressed: false,
            };
            return;
        }

        if let Mode::Single { moved: true, .. } = self.mode {
            out.push(Gesture::PanEnd { offset: self.pan });
        }
        let (a, b) = (self.contacts[0].position, self.contacts[1].position);
        self.mode = Mode::Pinch {
            start_distance: a.distance(b),
            start_zoom: self.zoom,
            last_center: (a + b) * 0.5,
        };
        trace!(zoom = self.zoom, "Pinch started");
    }

    fn pointer_move(&mut self, event: PointerEvent, out: &mut Gestures) {
        let Some(index) = self.contacts.iter().position(|c| c.id == event.id) else {
            return;
        };
        match self.mode {
            Mode::Single { .. } => {
                if let Some(long_press) = self.tick(event.time_ms) {
                    out.push(long_press);
                }
                self.track_single(event.position, out);
            }
            Mode::Pinch { .. } => {
                self.contacts[index].position = event.position;
                self.track_pinch(out);
            }
            Mode::Idle | Mode::Draining => self.contacts[index].position = event.position,
        }
    }

    fn pointer_up(&mut self, event: PointerEvent, out: &mut Gestures) {
        let Some(index) = self.contacts.iter().position(|c| c.id == event.id) else {
            return;
        };

        match self.mode {
            Mode::Single { .. } => {
                self.track_single(event.position, out);
                let contact = self.contacts.remove(index);
                if let Mode::Single {
                    moved,
                    long_pressed,
                } = self.mode
                {
                    self.finish_single(contact, event.time_ms, moved, long_pressed, out);
                }
                self.mode = Mode::Idle;
            }
            Mode::Pinch { .. } | Mode::Draining => {
                self.contacts.remove(index);
                self.mode = if self.contacts.is_empty() {
                    Mode::Idle
                } else {
                    Mode::Draining
                };
            }
            Mode::Idle => {
                self.contacts.remove(index);
            }
        }
    }

    fn cancel(&mut self) {
        trace!(contacts = self.contacts.len(), "Gesture cancelled");
        self.contacts.clear();
        self.mode = Mode::Idle;
    }

    /// Follow the single finger; pan starts once it leaves the jitter radius.
    fn track_single(&mut self, position: Vec2, out: &mut Gestures) {
        let Mode::Single { moved, .. } = &mut self.mode else {
            return;
        };
        let Some(contact) = self.contacts.first_mut() else {
            return;
        };

        let previous = if *moved {
            contact.position
        } else if position.distance(contact.start) > self.config.long_press_jitter {
            *moved = true;
            contact.start
        } else {
            contact.position = position;
            return;
        };
        contact.position = position;

        let delta = position - previous;
        if delta != Vec2::ZERO {
            self.pan += delta;
            out.push(Gesture::Pan {
                delta,
                offset: self.pan,
            });
        }
    }

    fn track_pinch(&mut self, out: &mut Gestures) {
        let Mode::Pinch {
            start_distance,
            start_zoom,
            last_center,
        } = &mut self.mode
        else {
            return;
        };
        let (a, b) = (self.contacts[0].position, self.contacts[1].position);
        let distance = a.distance(b);
        let center = (a + b) * 0.5;

        if *start_distance <= f32::EPSILON {
            // Fingers landed on the same spot; start measuring from here.
            *start_distance = distance;
            *start_zoom = self.zoom;
        } else {
            let requested = *start_zoom * distance / *start_distance;
            let zoom = self.config.clamp_zoom(requested);
            if (zoom - self.zoom).abs() > f32::EPSILON {
                if zoom != requested {
                    self.feedback.haptic(Haptic::Boundary);
                }
                self.zoom = zoom;
                out.push(Gesture::Pinch { zoom });
            }
        }

        let delta_x = center.x - last_center.x;
        *last_center = center;
        if delta_x != 0.0 {
            self.pan.x += delta_x;
            out.push(Gesture::TwoFingerPan {
                delta_x,
                offset: self.pan,
            });
        }
    }

    /// Release of a lone finger: swipe, tap or double tap.
    fn finish_single(
        &mut self,
        contact: Contact,
        time_ms: u64,
        moved: bool,
        long_pressed: bool,
        out: &mut Gestures,
    ) {
        if moved {
            out.push(Gesture::PanEnd { offset: self.pan });
            if let Some((direction, velocity)) = self.swipe_of(contact, time_ms) {
                debug!(?direction, velocity, "Swipe");
                self.feedback.haptic(Haptic::Selection);
                out.push(Gesture::Swipe {
                    direction,
                    velocity,
                });
            }
            self.last_tap = None;
            return;
        }
        if long_pressed {
            self.last_tap = None;
            return;
        }

        let position = contact.start;
        let is_double = self.last_tap.is_some_and(|(previous, at)| {
            time_ms.saturating_sub(at) <= self.config.double_tap_interval_ms
                && previous.distance(position) <= self.config.double_tap_distance
        });
        self.feedback.haptic(Haptic::Tap);
        if is_double {
            self.last_tap = None;
            out.push(Gesture::DoubleTap { position });
        } else {
            self.last_tap = Some((position, time_ms));
            out.push(Gesture::Tap { position });
        }
    }

    /// Swipe along the dominant axis when both displacement and average
    /// velocity pass their thresholds.
    fn swipe_of(&self, contact: Contact, time_ms: u64) -> Option<(SwipeDirection, f32)> {
        let displacement = contact.position - contact.start;
        let elapsed_ms = time_ms.saturating_sub(contact.start_ms).max(1) as f32;
        let (distance, direction) = if displacement.x.abs() >= displacement.y.abs() {
            let direction = if displacement.x < 0.0 {
                SwipeDirection::Left
            } else {
                SwipeDirection::Right
            };
            (displacement.x.abs(), direction)
        } else {
            let direction = if displacement.y < 0.0 {
                SwipeDirection::Up
            } else {
                SwipeDirection::Down
            };
            (displacement.y.abs(), direction)
        };
        let velocity = distance / elapsed_ms;
        (distance > self.config.swipe_distance_threshold
            && velocity > self.config.swipe_velocity_threshold)
            .then_some((direction, velocity))
    }
}

impl Default for TouchGestureController {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}
