//! Project metadata persistence.
//!
//! The relational backend is external; sessions only see the CRUD seam
//! [`MetadataStore`]. Two local implementations ship with the crate:
//!
//! ```text
//! InMemoryStore   HashMap<Uuid, StudioProject>, for tests and the CLI
//! JsonDirStore    <dir>/{project-uuid}.json sidecar files
//! ```

use crate::error::{SessionError, SessionResult};
use crate::model::{StudioProject, StudioTrack};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn load_project(&self, id: Uuid) -> SessionResult<StudioProject>;

    /// Insert or replace a whole project.
    async fn save_project(&self, project: &StudioProject) -> SessionResult<()>;

    /// Replace one track of a stored project.
    async fn update_track(&self, project_id: Uuid, track: &StudioTrack) -> SessionResult<()>;

    /// Returns whether the project existed.
    async fn delete_project(&self, id: Uuid) -> SessionResult<bool>;

    async fn list_projects(&self) -> SessionResult<Vec<Uuid>>;
}

fn replace_track(project: &mut StudioProject, track: &StudioTrack) -> SessionResult<()> {
    let slot = project
        .track_mut(track.id)
        .ok_or(SessionError::TrackNotFound(track.id))?;
    *slot = track.clone();
    Ok(())
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    projects: RwLock<HashMap<Uuid, StudioProject>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_projects(projects: impl IntoIterator<Item = StudioProject>) -> Self {
        Self {
            projects: RwLock::new(projects.into_iter().map(|p| (p.id, p)).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.projects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.read().is_empty()
    }
}

#[async_trait]
impl MetadataStore for InMemoryStore {
    async fn load_project(&self, id: Uuid) -> SessionResult<StudioProject> {
        self.projects
            .read()
            .get(&id)
            .cloned()
            .ok_or(SessionError::ProjectNotFound(id))
    }

    async fn save_project(&self, project: &StudioProject) -> SessionResult<()> {
        self.projects.write().insert(project.id, project.clone());
        Ok(())
    }

    async fn update_track(&self, project_id: Uuid, track: &StudioTrack) -> SessionResult<()> {
        let mut projects = self.projects.write();
        let project = projects
            .get_mut(&project_id)
            .ok_or(SessionError::ProjectNotFound(project_id))?;
        replace_track(project, track)
    }

    async fn delete_project(&self, id: Uuid) -> SessionResult<bool> {
        Ok(self.projects.write().remove(&id).is_some())
    }

    async fn list_projects(&self) -> SessionResult<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self.projects.read().keys().copied().collect();
        ids.sort_unstable();
        Ok(ids)
    }
}

/// One pretty-printed JSON file per project.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn write(&self, project: &StudioProject) -> SessionResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = project.to_json()?;
        let path = self.path_for(project.id);
        tokio::fs::write(&path, json).await?;
        debug!(path = %path.display(), "Project written");
        Ok(())
    }
}

#[async_trait]
impl MetadataStore for JsonDirStore {
    async fn load_project(&self, id: Uuid) -> SessionResult<StudioProject> {
        let json = match tokio::fs::read_to_string(self.path_for(id)).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SessionError::ProjectNotFound(id))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(StudioProject::from_json(&json)?)
    }

    async fn save_project(&self, project: &StudioProject) -> SessionResult<()> {
        self.write(project).await
    }

    async fn update_track(&self, project_id: Uuid, track: &StudioTrack) -> SessionResult<()> {
        let mut project = self.load_project(project_id).await?;
        replace_track(&mut project, track)?;
        self.write(&project).await
    }

    async fn delete_project(&self, id: Uuid) -> SessionResult<bool> {
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_projects(&self) -> SessionResult<Vec<Uuid>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(id) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| Uuid::parse_str(s).ok())
            {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> StudioProject {
        StudioProject::from_source("Song", "https://cdn/song.mp3", Some(120.0))
    }

    #[tokio::test]
    async fn test_in_memory_crud() {
        let store = InMemoryStore::new();
        let mut p = project();
        store.save_project(&p).await.unwrap();
        assert_eq!(store.len(), 1);

        p.tracks[0].volume = 0.3;
        store.update_track(p.id, &p.tracks[0]).await.unwrap();
        let loaded = store.load_project(p.id).await.unwrap();
        assert_eq!(loaded.tracks[0].volume, 0.3);

        assert!(store.delete_project(p.id).await.unwrap());
        assert!(!store.delete_project(p.id).await.unwrap());
        assert!(matches!(
            store.load_project(p.id).await,
            Err(SessionError::ProjectNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_unknown_track() {
        let p = project();
        let store = InMemoryStore::with_projects([p.clone()]);
        let stray = StudioTrack::new("x", "drums");
        assert!(matches!(
            store.update_track(p.id, &stray).await,
            Err(SessionError::TrackNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_json_dir_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::new(dir.path().join("projects"));
        assert!(store.list_projects().await.unwrap().is_empty());

        let mut p = project();
        store.save_project(&p).await.unwrap();
        p.tracks[0].muted = true;
        store.update_track(p.id, &p.tracks[0]).await.unwrap();

        let loaded = store.load_project(p.id).await.unwrap();
        assert_eq!(loaded, p);
        assert_eq!(store.list_projects().await.unwrap(), vec![p.id]);
        assert!(store.delete_project(p.id).await.unwrap());
        assert!(matches!(
            store.load_project(p.id).await,
            Err(SessionError::ProjectNotFound(_))
        ));
    }
}
