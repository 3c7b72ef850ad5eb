//! Touch gesture recognition driven by raw pointer sequences.

use stemstudio_gestures::{
    Gesture, GestureConfig, GestureListener, PointerEvent, SwipeDirection, TouchGestureController,
    Vec2,
};

fn drag(c: &mut TouchGestureController, from: Vec2, to: Vec2, start_ms: u64, duration_ms: u64) -> Vec<Gesture> {
    let mut out = Vec::new();
    out.extend(c.handle(PointerEvent::down(7, from, start_ms)));
    for step in 1..=4u64 {
        let f = step as f32 / 4.0;
        out.extend(c.handle(PointerEvent::moved(
            7,
            from + (to - from) * f,
            start_ms + duration_ms * step / 4,
        )));
    }
    out.extend(c.handle(PointerEvent::up(7, to, start_ms + duration_ms)));
    out
}

fn swipe_count(gestures: &[Gesture]) -> usize {
    gestures
        .iter()
        .filter(|g| matches!(g, Gesture::Swipe { .. }))
        .count()
}

#[test]
fn drags_classify_as_pan_or_swipe_by_distance_and_speed() {
    // (distance px, duration ms, expect swipe)
    let cases = [
        (30.0, 20, false),   // fast but short
        (80.0, 400, false),  // long but slow (0.2 px/ms)
        (80.0, 100, true),   // 0.8 px/ms
        (200.0, 300, true),  // 0.67 px/ms
        (200.0, 500, false), // 0.4 px/ms
        (60.0, 60, true),
    ];
    for (distance, duration, expect_swipe) in cases {
        let mut c = TouchGestureController::default();
        let gestures = drag(&mut c, Vec2::ZERO, Vec2::new(distance, 0.0), 0, duration);

        assert_eq!(
            swipe_count(&gestures),
            usize::from(expect_swipe),
            "distance {distance} over {duration} ms"
        );
        assert!(gestures.iter().any(|g| matches!(g, Gesture::Pan { .. })));
        assert!(!gestures
            .iter()
            .any(|g| matches!(g, Gesture::Tap { .. } | Gesture::DoubleTap { .. })));
        assert_eq!(c.pan(), Vec2::new(distance, 0.0));
    }
}

#[test]
fn vertical_flick_swipes_down() {
    let mut c = TouchGestureController::default();
    let gestures = drag(&mut c, Vec2::new(10.0, 10.0), Vec2::new(20.0, 150.0), 0, 100);
    let directions: Vec<SwipeDirection> = gestures
        .iter()
        .filter_map(|g| match g {
            Gesture::Swipe { direction, .. } => Some(*direction),
            _ => None,
        })
        .collect();
    assert_eq!(directions, vec![SwipeDirection::Down]);
}

#[test]
fn pinch_zoom_never_leaves_bounds() {
    let mut c = TouchGestureController::default();
    c.handle(PointerEvent::down(1, Vec2::new(0.0, 0.0), 0));
    c.handle(PointerEvent::down(2, Vec2::new(100.0, 0.0), 0));

    for (i, x) in [150.0, 400.0, 5000.0, 60.0, 10.0, 1.0, 100.0].into_iter().enumerate() {
        c.handle(PointerEvent::moved(2, Vec2::new(x, 0.0), 10 * (i as u64 + 1)));
        let zoom = c.zoom();
        assert!((0.5..=3.0).contains(&zoom), "zoom {zoom} after x = {x}");
    }
}

#[test]
fn two_finger_drag_pans_horizontally_only() {
    let mut c = TouchGestureController::default();
    c.handle(PointerEvent::down(1, Vec2::new(100.0, 100.0), 0));
    c.handle(PointerEvent::down(2, Vec2::new(200.0, 100.0), 0));
    c.handle(PointerEvent::moved(1, Vec2::new(140.0, 160.0), 16));
    let out = c.handle(PointerEvent::moved(2, Vec2::new(240.0, 160.0), 16));

    assert!(out.iter().any(|g| matches!(g, Gesture::TwoFingerPan { .. })));
    assert_eq!(c.pan().y, 0.0);
    assert!((c.pan().x - 40.0).abs() < 1e-4);
    assert!((c.zoom() - 1.0).abs() < 1e-4);
}

#[derive(Default)]
struct TapCounter {
    taps: usize,
    double_taps: usize,
    long_presses: usize,
}

impl GestureListener for TapCounter {
    fn on_tap(&mut self, _position: Vec2) {
        self.taps += 1;
    }

    fn on_double_tap(&mut self, _position: Vec2) {
        self.double_taps += 1;
    }

    fn on_long_press(&mut self, _position: Vec2) {
        self.long_presses += 1;
    }
}

fn tap(c: &mut TouchGestureController, listener: &mut TapCounter, at: Vec2, down_ms: u64) {
    c.handle_with(PointerEvent::down(1, at, down_ms), listener);
    c.handle_with(PointerEvent::up(1, at, down_ms + 40), listener);
}

#[test]
fn double_tap_needs_time_and_distance_window() {
    let mut c = TouchGestureController::default();
    let mut listener = TapCounter::default();

    tap(&mut c, &mut listener, Vec2::new(50.0, 50.0), 0);
    tap(&mut c, &mut listener, Vec2::new(60.0, 55.0), 200);
    assert_eq!((listener.taps, listener.double_taps), (1, 1));

    // Too slow.
    tap(&mut c, &mut listener, Vec2::new(50.0, 50.0), 1000);
    tap(&mut c, &mut listener, Vec2::new(50.0, 50.0), 1400);
    assert_eq!((listener.taps, listener.double_taps), (3, 1));

    // Too far.
    tap(&mut c, &mut listener, Vec2::new(300.0, 50.0), 1500);
    assert_eq!((listener.taps, listener.double_taps), (4, 1));
}

#[test]
fn long_press_replaces_the_tap() {
    let mut c = TouchGestureController::new(GestureConfig {
        long_press_duration_ms: 400,
        ..GestureConfig::default()
    });
    let mut listener = TapCounter::default();

    c.handle_with(PointerEvent::down(1, Vec2::new(5.0, 5.0), 0), &mut listener);
    assert!(c.tick(399).is_none());
    if let Some(gesture) = c.tick(400) {
        gesture.dispatch(&mut listener);
    }
    assert!(c.tick(900).is_none());
    c.handle_with(PointerEvent::up(1, Vec2::new(5.0, 5.0), 950), &mut listener);

    assert_eq!((listener.long_presses, listener.taps), (1, 0));
}
