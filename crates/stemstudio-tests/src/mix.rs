//! Mix coordination and live playback over the shared cache.

use crate::fixtures::{buffer_of, small_buffer_cache};
use std::sync::Arc;
use stemstudio_core::AudioBuffer;
use stemstudio_mixer::{
    find_preset, sort_by_type, MixCoordinator, MixError, MixEvent, MixerConfig, PlaybackEngine,
    PlaybackState, StemState,
};

fn band() -> MixCoordinator {
    MixCoordinator::with_stems(
        MixerConfig::default(),
        [
            StemState::new("drums", "drums").with_source("https://cdn/drums.mp3"),
            StemState::new("bass", "bass").with_source("https://cdn/bass.mp3"),
            StemState::new("vocals", "vocals").with_source("https://cdn/vocals.mp3"),
            StemState::new("guitar", "guitar").with_source("https://cdn/guitar.mp3"),
        ],
    )
    .unwrap()
}

#[test]
fn solo_silences_every_other_stem() {
    let mut mix = band();
    mix.set_master_volume(0.5);
    mix.set_volume("vocals", 0.8).unwrap();
    mix.toggle_solo("vocals").unwrap();

    for stem in ["drums", "bass", "guitar"] {
        assert!(!mix.is_audible(stem), "{stem} should be silenced");
        assert_eq!(mix.effective_gain(stem), 0.0);
    }
    assert!((mix.effective_gain("vocals") - 0.4).abs() < 1e-6);

    // A second solo joins the first; mute still wins over solo.
    mix.toggle_solo("bass").unwrap();
    assert!(mix.is_audible("bass"));
    mix.toggle_mute("bass").unwrap();
    assert!(!mix.is_audible("bass"));
    assert!(mix.is_audible("vocals"));

    // Clearing every solo restores the unmuted stems.
    mix.toggle_solo("vocals").unwrap();
    mix.toggle_solo("bass").unwrap();
    assert!(mix.is_audible("drums") && mix.is_audible("guitar"));
    assert!(!mix.is_audible("bass"));
}

#[test]
fn snapshot_resolves_solo_into_mute() {
    let mut mix = band();
    mix.toggle_solo("drums").unwrap();
    let snapshot = mix.snapshot();

    let active: Vec<&str> = snapshot.active_stems().map(|s| s.stem_id.as_str()).collect();
    assert_eq!(active, vec!["drums"]);
    assert!(snapshot
        .stems
        .iter()
        .filter(|s| s.stem_id != "drums")
        .all(|s| s.muted && s.gain == 0.0));

    // Later edits leave the snapshot alone.
    mix.toggle_solo("drums").unwrap();
    assert_eq!(snapshot.active_stems().count(), 1);
}

#[test]
fn vocals_sort_first_and_others_keep_order() {
    let mut types = vec!["drums", "vocals", "bass", "lead_vocal", "guitar"];
    sort_by_type(&mut types, |t| *t);
    assert_eq!(types, vec!["vocals", "lead_vocal", "drums", "bass", "guitar"]);

    let mix = band();
    let ids: Vec<&str> = mix.stems().iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["vocals", "drums", "bass", "guitar"]);
}

#[test]
fn seek_is_clamped_to_duration() {
    let mut mix = band();
    mix.set_duration(Some(180.0));

    assert_eq!(mix.seek(200.0), 180.0);
    assert_eq!(mix.seek(-5.0), 0.0);
    assert_eq!(mix.seek(42.5), 42.5);
    assert_eq!(mix.transport().current_time(), 42.5);
    assert_eq!(mix.playback_state(), PlaybackState::Stopped);
}

#[test]
fn playback_ends_paused_at_duration() {
    let mut mix = band();
    mix.set_duration(Some(2.0));
    let (_, events) = mix.subscribe();

    mix.play();
    assert!(!mix.advance(1.5));
    assert!(mix.advance(1.0));
    assert_eq!(mix.playback_state(), PlaybackState::Paused);
    assert_eq!(mix.transport().current_time(), 2.0);

    let received: Vec<MixEvent> = events.try_iter().collect();
    assert!(received.contains(&MixEvent::Ended));
}

#[test]
fn unknown_stem_is_reported() {
    let mut mix = band();
    assert!(matches!(
        mix.set_volume("keys", 0.5),
        Err(MixError::UnknownStem(_))
    ));
    assert_eq!(mix.effective_gain("keys"), 0.0);
    assert!(!mix.is_audible("keys"));
}

#[test]
fn karaoke_preset_mutes_vocals() {
    let mut mix = band();
    let karaoke = find_preset("karaoke").unwrap();
    mix.apply_preset(&karaoke);
    assert!(!mix.is_audible("vocals"));
    assert!(mix.is_audible("drums"));
}

#[test]
fn engine_renders_cached_stems_and_reports_missing_ones() {
    let cache = small_buffer_cache();
    cache.set(
        "https://cdn/drums.mp3",
        Arc::new(AudioBuffer::from_samples(vec![0.5; 100], 100, 1).unwrap()),
    );
    cache.set("https://cdn/unused.mp3", buffer_of(64));

    let mut mix = band();
    mix.set_master_volume(1.0);
    mix.toggle_mute("vocals").unwrap();
    mix.toggle_mute("guitar").unwrap();

    let mut engine = PlaybackEngine::new(100);
    let mut out = vec![0.0f32; 20];
    let report = engine.render(&mix, &cache, &mut out);

    assert_eq!(report.frames, 10);
    assert_eq!(report.mixed, 1);
    assert_eq!(report.unresolved, vec!["bass".to_string()]);

    // Centre pan: 0.5 × cos(π/4) on both sides.
    let expected = 0.5 * std::f32::consts::FRAC_1_SQRT_2;
    assert!(out.iter().all(|s| (s - expected).abs() < 1e-5), "{out:?}");
}
