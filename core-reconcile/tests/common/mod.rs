//! Shared fakes for the reconciliation integration tests
//!
//! Libraries live in real scratch directories driven through
//! `TokioFileSystem`. Audio files hold placeholder bytes; their tags come
//! from a table keyed by file name, so a file keeps its identity when moved.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_desktop::TokioFileSystem;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, FileMetadata, FileSystemAccess, LockBreaker, RemoteCatalog, RemotePlaylist,
    RemoteTrack, TagReader, TrackTags,
};
use bytes::Bytes;
use core_runtime::{ReconcileConfig, ReconcileConfigBuilder};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub struct Scratch {
    pub base: PathBuf,
}

impl Scratch {
    pub fn new() -> Self {
        let base = std::env::temp_dir().join(format!("shelfsync-reconcile-{}", Uuid::new_v4()));
        fs::create_dir_all(&base).unwrap();
        Self { base }
    }

    pub fn library(&self) -> PathBuf {
        self.base.join("library")
    }

    pub fn staging(&self) -> PathBuf {
        self.base.join("library_staging")
    }

    pub fn config_dir(&self) -> PathBuf {
        self.base.join("config")
    }

    /// Create `<root>/<playlist>/<file>` with placeholder content
    pub fn put(&self, root: &Path, playlist: &str, file: &str) -> PathBuf {
        let path = root.join(playlist).join(file);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"not really audio").unwrap();
        path
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.base);
    }
}

// ============================================================================
// Tag reader
// ============================================================================

/// Tags by file name, or by exact path for files that share a name with a
/// different track elsewhere. Path entries win.
#[derive(Default)]
pub struct FakeTagReader {
    tags: Mutex<HashMap<String, TrackTags>>,
    by_path: Mutex<HashMap<PathBuf, TrackTags>>,
}

fn track_tags(title: &str, artist: &str, album: &str) -> TrackTags {
    TrackTags {
        title: title.to_string(),
        artist: artist.to_string(),
        album: album.to_string(),
    }
}

impl FakeTagReader {
    pub fn with(self, file: &str, title: &str, artist: &str, album: &str) -> Self {
        self.tags
            .lock()
            .unwrap()
            .insert(file.to_string(), track_tags(title, artist, album));
        self
    }

    pub fn with_path(self, path: &Path, title: &str, artist: &str, album: &str) -> Self {
        self.by_path
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), track_tags(title, artist, album));
        self
    }
}

#[async_trait]
impl TagReader for FakeTagReader {
    async fn read_tags(&self, path: &Path) -> BridgeResult<TrackTags> {
        if let Some(tags) = self.by_path.lock().unwrap().get(path) {
            return Ok(tags.clone());
        }
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        self.tags
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .ok_or_else(|| BridgeError::TagExtraction(format!("no tags for {name}")))
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Default)]
pub struct FakeCatalog {
    playlists: Mutex<BTreeMap<String, Vec<RemoteTrack>>>,
    reject_session: Mutex<bool>,
    failing_playlists: Mutex<Vec<String>>,
    pub track_fetches: AtomicU32,
}

impl FakeCatalog {
    pub fn playlist(self, name: &str, tracks: Vec<RemoteTrack>) -> Self {
        self.set_playlist(name, tracks);
        self
    }

    pub fn set_playlist(&self, name: &str, tracks: Vec<RemoteTrack>) {
        self.playlists
            .lock()
            .unwrap()
            .insert(name.to_string(), tracks);
    }

    pub fn reject_session(&self) {
        *self.reject_session.lock().unwrap() = true;
    }

    pub fn fail_playlist(&self, name: &str) {
        self.failing_playlists.lock().unwrap().push(name.to_string());
    }

    fn check_session(&self) -> BridgeResult<()> {
        if *self.reject_session.lock().unwrap() {
            return Err(BridgeError::SessionInvalid("401 Unauthorized".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteCatalog for FakeCatalog {
    async fn fetch_playlists(&self, _access_token: &str) -> BridgeResult<Vec<RemotePlaylist>> {
        self.check_session()?;
        Ok(self
            .playlists
            .lock()
            .unwrap()
            .keys()
            .map(|name| RemotePlaylist::new(format!("id-{name}"), name))
            .collect())
    }

    async fn fetch_playlist_tracks(
        &self,
        _access_token: &str,
        playlist_id: &str,
        _page_size: u32,
    ) -> BridgeResult<Vec<RemoteTrack>> {
        self.check_session()?;
        self.track_fetches.fetch_add(1, Ordering::SeqCst);
        let name = playlist_id.trim_start_matches("id-");
        if self.failing_playlists.lock().unwrap().iter().any(|p| p == name) {
            return Err(BridgeError::Remote(format!("503 for {name}")));
        }
        Ok(self
            .playlists
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .unwrap_or_default())
    }
}

// ============================================================================
// Lock breaker
// ============================================================================

#[derive(Default)]
pub struct CountingLockBreaker {
    pub force_closes: AtomicU32,
    pub relaunches: Mutex<Vec<PathBuf>>,
}

#[async_trait]
impl LockBreaker for CountingLockBreaker {
    async fn force_close(&self) -> BridgeResult<bool> {
        self.force_closes.fetch_add(1, Ordering::SeqCst);
        Ok(true)
    }

    async fn relaunch(&self, executable: &Path) -> BridgeResult<()> {
        self.relaunches
            .lock()
            .unwrap()
            .push(executable.to_path_buf());
        Ok(())
    }
}

// ============================================================================
// File system
// ============================================================================

/// Real file system whose first `locked_attempts` renames fail as if the
/// file were held open by another process.
pub struct LockedFileSystem {
    inner: TokioFileSystem,
    locked_attempts: u32,
    pub renames: AtomicU32,
}

impl LockedFileSystem {
    pub fn new(locked_attempts: u32) -> Self {
        Self {
            inner: TokioFileSystem::new(),
            locked_attempts,
            renames: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl FileSystemAccess for LockedFileSystem {
    async fn exists(&self, path: &Path) -> BridgeResult<bool> {
        self.inner.exists(path).await
    }
    async fn metadata(&self, path: &Path) -> BridgeResult<FileMetadata> {
        self.inner.metadata(path).await
    }
    async fn create_dir_all(&self, path: &Path) -> BridgeResult<()> {
        self.inner.create_dir_all(path).await
    }
    async fn read_file(&self, path: &Path) -> BridgeResult<Bytes> {
        self.inner.read_file(path).await
    }
    async fn write_file(&self, path: &Path, data: Bytes) -> BridgeResult<()> {
        self.inner.write_file(path, data).await
    }
    async fn list_directory(&self, path: &Path) -> BridgeResult<Vec<PathBuf>> {
        self.inner.list_directory(path).await
    }
    async fn rename(&self, from: &Path, to: &Path) -> BridgeResult<()> {
        let attempt = self.renames.fetch_add(1, Ordering::SeqCst);
        if attempt < self.locked_attempts {
            return Err(BridgeError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "file is being used by another process",
            )));
        }
        self.inner.rename(from, to).await
    }
}

/// Fast-polling config over the scratch roots; override fields before `build`.
pub fn builder(
    scratch: &Scratch,
    catalog: Arc<FakeCatalog>,
    tags: Arc<FakeTagReader>,
    breaker: Arc<CountingLockBreaker>,
) -> ReconcileConfigBuilder {
    ReconcileConfig::builder()
        .library_base(&scratch.base)
        .config_dir(scratch.config_dir())
        .poll_interval(Duration::from_millis(20))
        .file_system(Arc::new(TokioFileSystem::new()))
        .catalog(catalog)
        .tag_reader(tags)
        .lock_breaker(breaker)
}

pub fn config(
    scratch: &Scratch,
    catalog: Arc<FakeCatalog>,
    tags: Arc<FakeTagReader>,
    breaker: Arc<CountingLockBreaker>,
) -> ReconcileConfig {
    builder(scratch, catalog, tags, breaker).build().unwrap()
}
