//! Export pipeline: validation, local rendering, progress and cancellation.

use crate::fixtures::{cache_with, tone, FakeNetwork};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stemstudio_cache::CacheConfig;
use stemstudio_export::{
    ExportError, ExportFormat, ExportProgress, ExportSettings, ExportStage, MixExportPipeline,
    MixRenderer, MixSpec, OfflineRenderer, ProgressReporter, RenderedMix,
};
use stemstudio_mixer::{MixCoordinator, MixSnapshot, MixerConfig, StemState};

/// Counts calls and renders a fixed payload, or loops on checkpoints until
/// cancelled when `stall` is set.
#[derive(Default)]
struct CountingRenderer {
    calls: AtomicUsize,
    stall: bool,
}

#[async_trait]
impl MixRenderer for CountingRenderer {
    async fn render(
        &self,
        spec: &MixSpec,
        _format: ExportFormat,
        progress: &ProgressReporter,
    ) -> stemstudio_export::ExportResult<RenderedMix> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stall {
            for _ in 0..2000 {
                progress.checkpoint()?;
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }
        progress.report(ExportStage::Processing, 1.0);
        Ok(RenderedMix {
            bytes: vec![0; spec.stems.len()],
            duration_secs: spec.duration_secs,
        })
    }
}

fn snapshot(muted: &[&str]) -> MixSnapshot {
    let mut mix = MixCoordinator::with_stems(
        MixerConfig::default(),
        [
            StemState::new("vocals", "vocals").with_source("https://cdn/vocals.mp3"),
            StemState::new("drums", "drums").with_source("https://cdn/drums.mp3"),
        ],
    )
    .unwrap();
    for id in muted {
        mix.toggle_mute(id).unwrap();
    }
    mix.snapshot()
}

fn recorder() -> (Arc<Mutex<Vec<ExportProgress>>>, impl Fn(ExportProgress) + Send + Sync + 'static) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |p| sink.lock().unwrap().push(p))
}

#[tokio::test]
async fn all_muted_fails_before_rendering() {
    let renderer = Arc::new(CountingRenderer::default());
    let pipeline = MixExportPipeline::new(renderer.clone(), ExportSettings::default());
    let (seen, on_progress) = recorder();

    let err = pipeline
        .export_mix(&snapshot(&["vocals", "drums"]), ExportFormat::Wav, on_progress)
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::NoActiveStems));
    assert!(err.user_message().contains("Unmute"));
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    assert!(seen.lock().unwrap().is_empty());
    assert!(!pipeline.is_exporting());
}

#[tokio::test]
async fn renderer_only_sees_audible_stems() {
    let renderer = Arc::new(CountingRenderer::default());
    let pipeline = MixExportPipeline::new(renderer.clone(), ExportSettings::default());

    let artifact = pipeline
        .export_mix(&snapshot(&["drums"]), ExportFormat::Mp3, |_| {})
        .await
        .unwrap();
    assert_eq!(artifact.bytes.len(), 1);
    assert_eq!(artifact.format, ExportFormat::Mp3);
    assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn offline_wav_export_reports_progress_to_done() {
    let network = Arc::new(
        FakeNetwork::default()
            .serve("https://cdn/vocals.mp3", tone(200))
            .serve("https://cdn/drums.mp3", tone(60)),
    );
    let cache = cache_with(CacheConfig::default(), network);
    let settings = ExportSettings {
        sample_rate: 8000,
        ..ExportSettings::default()
    };
    let pipeline = MixExportPipeline::new(Arc::new(OfflineRenderer::new(cache.clone())), settings);
    let (seen, on_progress) = recorder();

    let artifact = pipeline
        .export_mix(&snapshot(&[]), ExportFormat::Wav, on_progress)
        .await
        .unwrap();

    assert_eq!(&artifact.bytes[..4], b"RIFF");
    assert_eq!(&artifact.bytes[8..12], b"WAVE");
    assert_eq!(artifact.sample_rate, 8000);
    assert!((artifact.duration_secs - 1.0).abs() < 1e-9);
    // 16-bit stereo PCM plus header.
    assert!(artifact.bytes.len() >= 8000 * 4);
    assert_eq!(artifact.file_name("Night Drive"), "Night_Drive_mix.wav");
    assert_eq!(cache.get_stats().entry_count, 2);

    let seen = seen.lock().unwrap();
    let percents: Vec<u8> = seen.iter().map(|p| p.percent).collect();
    assert!(percents.windows(2).all(|w| w[0] <= w[1]), "{percents:?}");
    let last = seen.last().unwrap();
    assert_eq!((last.percent, last.stage), (100, ExportStage::Done));
    assert!(seen.iter().any(|p| p.stage == ExportStage::LoadingStems));
}

#[tokio::test]
async fn missing_stem_audio_fails_the_export() {
    let cache = cache_with(CacheConfig::default(), Arc::new(FakeNetwork::default()));
    let pipeline = MixExportPipeline::new(
        Arc::new(OfflineRenderer::new(cache)),
        ExportSettings::default(),
    );
    let err = pipeline
        .export_mix(&snapshot(&[]), ExportFormat::Wav, |_| {})
        .await
        .unwrap_err();
    assert!(matches!(err, ExportError::Source(_)));
    assert!(err.user_message().contains("download"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancel_stops_a_running_export() {
    let renderer = Arc::new(CountingRenderer {
        stall: true,
        ..CountingRenderer::default()
    });
    let pipeline = Arc::new(MixExportPipeline::new(renderer, ExportSettings::default()));

    let running = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move {
            pipeline
                .export_mix(&snapshot(&[]), ExportFormat::Wav, |_| {})
                .await
        })
    };
    while !pipeline.is_exporting() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(pipeline.cancel_export());

    let result = running.await.unwrap();
    assert!(matches!(result, Err(ExportError::Cancelled)));
    assert!(!pipeline.is_exporting());
    assert!(!pipeline.cancel_export());
}
