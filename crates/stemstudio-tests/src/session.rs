//! A studio session from project file to exported mix.

use crate::fixtures::{cache_with, tone, FakeNetwork};
use std::sync::Arc;
use stemstudio_cache::CacheConfig;
use stemstudio_export::{ExportError, ExportFormat};
use stemstudio_gestures::{PointerEvent, Vec2};
use stemstudio_mixer::PlaybackState;
use stemstudio_session::{
    InMemoryStore, JsonDirStore, MetadataStore, SessionError, StudioConfig, StudioProject,
    StudioSession, StudioTrack, TrackStatus, TrackVersion,
};
use uuid::Uuid;

const VOCALS: &str = "https://cdn/night/vocals.mp3";
const DRUMS: &str = "https://cdn/night/drums.mp3";
const BASS: &str = "https://cdn/night/bass.mp3";
const GUITAR: &str = "https://cdn/night/guitar_a.mp3";

fn network() -> Arc<FakeNetwork> {
    Arc::new(
        FakeNetwork::default()
            .serve(VOCALS, tone(200))
            .serve(DRUMS, tone(90))
            .serve(GUITAR, tone(150)),
    )
}

fn config() -> StudioConfig {
    let mut config = StudioConfig::default();
    config.mixer.sample_rate = 8000;
    config.cache.preload_delay_ms = 0;
    config
}

struct Song {
    project: StudioProject,
    vocals: Uuid,
    bass: Uuid,
    guitar: Uuid,
}

fn song() -> Song {
    let mut project = StudioProject::new("Night Drive");
    project.duration_secs = Some(1.0);
    project.add_track(StudioTrack::new("Drums", "drums").with_audio(DRUMS, Some(1.0)));
    let bass = project.add_track(StudioTrack::new("Bass", "bass").with_audio(BASS, Some(1.0)));
    let vocals = project.add_track(StudioTrack::new("Vocals", "vocals").with_audio(VOCALS, Some(1.0)));
    let guitar = project.add_track(StudioTrack::pending("Guitar", "guitar", "task-7"));
    Song {
        project,
        vocals,
        bass,
        guitar,
    }
}

#[tokio::test]
async fn session_round_trip_through_json_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(JsonDirStore::new(dir.path()));
    let Song {
        project,
        vocals,
        bass,
        guitar,
    } = song();
    store.save_project(&project).await.unwrap();

    let cache = cache_with(CacheConfig::default(), network());
    let mut session = StudioSession::open(project.id, store.clone(), cache, &config())
        .await
        .unwrap();

    // Vocals lead the stem lanes; the pending guitar has no audio yet.
    assert_eq!(session.mixer().stems()[0].id, vocals.to_string());
    assert!(session.mixer().stem(&guitar.to_string()).unwrap().source.is_none());

    let report = session.load_stems().await;
    assert_eq!(report.loaded, 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, bass.to_string());
    assert!(report.failed[0].1.contains("download"));

    // The generation task lands.
    let resolved = session
        .resolve_pending(
            "task-7",
            vec![TrackVersion {
                label: "A".into(),
                audio_url: GUITAR.into(),
                duration_secs: Some(1.0),
            }],
        )
        .await
        .unwrap();
    assert_eq!(resolved, Some(guitar));
    assert_eq!(
        session.mixer().stem(&guitar.to_string()).unwrap().source.as_deref(),
        Some(GUITAR)
    );
    assert_eq!(session.resolve_pending("task-7", Vec::new()).await.unwrap(), None);

    // Exporting with the broken bass audible fails; muting it fixes that.
    assert!(matches!(
        session.export(ExportFormat::Wav, |_| {}).await,
        Err(SessionError::Export(ExportError::Source(_)))
    ));
    session.mixer_mut().toggle_mute(&bass.to_string()).unwrap();
    let artifact = session.export(ExportFormat::Wav, |_| {}).await.unwrap();
    assert_eq!(&artifact.bytes[..4], b"RIFF");
    assert_eq!(session.download_name(&artifact), "Night_Drive_mix.wav");
    assert!(!session.is_exporting());

    // Tap the timeline at 50 px with 100 px per second: seek to 0.5 s.
    session.handle_pointer(PointerEvent::down(1, Vec2::new(50.0, 20.0), 0), 100.0);
    session.handle_pointer(PointerEvent::up(1, Vec2::new(50.0, 20.0), 40), 100.0);
    assert!((session.mixer().transport().current_time() - 0.5).abs() < 1e-6);
    session.handle_pointer(PointerEvent::down(1, Vec2::new(52.0, 20.0), 150), 100.0);
    session.handle_pointer(PointerEvent::up(1, Vec2::new(52.0, 20.0), 190), 100.0);
    assert_eq!(session.mixer().playback_state(), PlaybackState::Playing);

    session.close().await.unwrap();

    let saved = store.load_project(project.id).await.unwrap();
    assert_eq!(saved.revision, 1);
    assert!(saved.track(bass).unwrap().muted);
    let saved_guitar = saved.track(guitar).unwrap();
    assert_eq!(saved_guitar.status, TrackStatus::Ready);
    assert_eq!(saved_guitar.active_version.as_deref(), Some("A"));
    assert_eq!(saved_guitar.source_url(), Some(GUITAR));
}

#[tokio::test]
async fn muting_everything_blocks_export() {
    let Song { project, .. } = song();
    let ids: Vec<String> = project.tracks.iter().map(|t| t.id.to_string()).collect();
    let store = Arc::new(InMemoryStore::with_projects([project.clone()]));
    let cache = cache_with(CacheConfig::default(), network());
    let mut session = StudioSession::open(project.id, store, cache, &config())
        .await
        .unwrap();

    for id in &ids {
        if !session.mixer().stem(id).unwrap().muted() {
            session.mixer_mut().toggle_mute(id).unwrap();
        }
    }
    let err = session.export(ExportFormat::Mp3, |_| {}).await.unwrap_err();
    assert!(matches!(err, SessionError::Export(ExportError::NoActiveStems)));
}

#[tokio::test]
async fn unknown_project_does_not_open() {
    let store = Arc::new(InMemoryStore::new());
    let cache = cache_with(CacheConfig::default(), network());
    let missing = Uuid::new_v4();
    let result = StudioSession::open(missing, store, cache, &config()).await;
    assert!(matches!(result, Err(SessionError::ProjectNotFound(id)) if id == missing));
}

#[tokio::test]
async fn version_links_switch_the_playing_audio() {
    let Song {
        project, vocals, ..
    } = song();
    let store = Arc::new(InMemoryStore::with_projects([project.clone()]));
    let cache = cache_with(CacheConfig::default(), network());
    let mut session = StudioSession::open(project.id, store.clone(), cache, &config())
        .await
        .unwrap();

    session
        .link_track_version(
            vocals,
            TrackVersion {
                label: "B".into(),
                audio_url: GUITAR.into(),
                duration_secs: Some(1.0),
            },
        )
        .await
        .unwrap();

    let track = session.project().track(vocals).unwrap();
    assert_eq!(track.active_version.as_deref(), Some("B"));
    assert_eq!(track.version("A").unwrap().audio_url, VOCALS);
    assert_eq!(
        session.mixer().stem(&vocals.to_string()).unwrap().source.as_deref(),
        Some(GUITAR)
    );

    let stored = store.load_project(project.id).await.unwrap();
    assert_eq!(stored.track(vocals).unwrap().source_url(), Some(GUITAR));
}

#[tokio::test]
async fn export_after_load_downloads_each_stem_once() {
    let Song { project, bass, .. } = song();
    let store = Arc::new(InMemoryStore::with_projects([project.clone()]));
    let network = network();
    let cache = cache_with(CacheConfig::default(), Arc::clone(&network));
    let mut session = StudioSession::open(project.id, store, cache, &config())
        .await
        .unwrap();
    session.mixer_mut().toggle_mute(&bass.to_string()).unwrap();

    let report = session.load_stems().await;
    assert_eq!(report.loaded, 2);
    // Drums, vocals and the failing bass.
    assert_eq!(network.request_count(), 3);

    let artifact = session.export(ExportFormat::Wav, |_| {}).await.unwrap();
    assert_eq!(&artifact.bytes[..4], b"RIFF");
    assert_eq!(network.request_count(), 3);
}
