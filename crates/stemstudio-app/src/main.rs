//! Stem Studio - command-line front end
//!
//! Opens a project file, resolves its stems through the buffer cache and
//! exports the mix. This binary is the composition root: it owns the one
//! process-wide `BufferCache`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use stemstudio_cache::BufferCache;
use stemstudio_export::{ExportError, ExportFormat};
use stemstudio_mixer::{builtin_presets, find_preset};
use stemstudio_session::{
    InMemoryStore, MetadataStore, SessionError, StudioConfig, StudioProject, StudioSession,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "stemstudio")]
#[command(about = "Mix and export AI-generated stems")]
#[command(version)]
struct Cli {
    /// Studio configuration file (JSON)
    #[arg(long, global = true, env = "STEMSTUDIO_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render the project's audible stems into one file
    Export {
        /// Project file (JSON)
        project: PathBuf,
        /// Output file, or a directory to use the default download name
        #[arg(short, long)]
        out: PathBuf,
        /// Output format: wav or mp3
        #[arg(short, long, default_value = "wav")]
        format: ExportFormat,
        /// Mix preset applied before exporting
        #[arg(long)]
        preset: Option<String>,
    },
    /// Fetch and decode every stem, then print cache statistics
    Preload {
        /// Project file (JSON)
        project: PathBuf,
    },
    /// List the built-in mix presets
    Presets,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => StudioConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => StudioConfig::default(),
    };

    match cli.command {
        Commands::Export {
            project,
            out,
            format,
            preset,
        } => export(&config, &project, &out, format, preset.as_deref()).await,
        Commands::Preload { project } => preload(&config, &project).await,
        Commands::Presets => {
            for preset in builtin_presets() {
                println!("{:<12} {}", preset.id, preset.name);
            }
            Ok(())
        }
    }
}

/// Read a project file into a fresh in-memory store and open it.
async fn open_session(config: &StudioConfig, path: &Path) -> Result<StudioSession> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read project {}", path.display()))?;
    let project = StudioProject::from_json(&json)
        .with_context(|| format!("Invalid project file {}", path.display()))?;
    let project_id = project.id;

    let store: Arc<dyn MetadataStore> = Arc::new(InMemoryStore::with_projects([project]));
    let cache = BufferCache::with_default_io(config.cache.clone())
        .context("Failed to initialize buffer cache")?;

    let session = StudioSession::open(project_id, store, cache, config)
        .await
        .context("Failed to open project")?;
    Ok(session)
}

async fn export(
    config: &StudioConfig,
    project: &Path,
    out: &Path,
    format: ExportFormat,
    preset: Option<&str>,
) -> Result<()> {
    let mut session = open_session(config, project).await?;

    if let Some(id) = preset {
        let Some(preset) = find_preset(id) else {
            bail!("Unknown preset '{id}'. Run `stemstudio presets` to list them.");
        };
        session.mixer_mut().apply_preset(&preset);
        info!(preset = %preset.id, "Applied mix preset");
    }

    // Decode everything up front so the export renders from the cache and
    // a broken stem is reported before rendering starts.
    let report = session.load_stems().await;
    for (stem_id, reason) in &report.failed {
        warn!(stem_id = %stem_id, "{reason}");
    }
    let result = session
        .export(format, |progress| {
            info!(
                percent = progress.percent,
                stage = progress.stage.display_name(),
                "{}",
                progress.message
            );
        })
        .await;

    let artifact = match result {
        Ok(artifact) => artifact,
        Err(SessionError::Export(e @ ExportError::NoActiveStems)) => {
            warn!("{}", e.user_message());
            bail!(e);
        }
        Err(e) => return Err(e).context("Export failed"),
    };

    let path = if out.is_dir() {
        out.join(session.download_name(&artifact))
    } else {
        out.to_path_buf()
    };
    artifact
        .save(&path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(
        path = %path.display(),
        bytes = artifact.bytes.len(),
        duration_secs = artifact.duration_secs,
        "Mix exported"
    );
    Ok(())
}

async fn preload(config: &StudioConfig, project: &Path) -> Result<()> {
    let mut session = open_session(config, project).await?;
    let report = session.load_stems().await;
    for (stem_id, reason) in &report.failed {
        warn!(stem_id = %stem_id, "{reason}");
    }
    info!(loaded = report.loaded, failed = report.failed.len(), "Preload finished");

    let stats = session.cache().get_stats();
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
