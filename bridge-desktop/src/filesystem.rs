//! `FileSystemAccess` over `tokio::fs`.
//!
//! Writes go through a sibling `.partial` file and a rename, so a crash while
//! persisting the pending set leaves the previous copy intact.

use async_trait::async_trait;
use bridge_traits::{
    error::Result,
    storage::{FileMetadata, FileSystemAccess},
};
use bytes::Bytes;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::fs;
use tracing::debug;

const CONFIG_DIR_NAME: &str = ".shelfsync";
const PARTIAL_SUFFIX: &str = ".partial";

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// `~/.shelfsync`, or `./.shelfsync` when the home directory is unknown.
    pub fn default_config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_DIR_NAME)
    }

    fn partial_path(path: &Path) -> PathBuf {
        let mut name = path
            .file_name()
            .map(OsString::from)
            .unwrap_or_default();
        name.push(PARTIAL_SUFFIX);
        path.with_file_name(name)
    }
}

fn to_file_metadata(metadata: std::fs::Metadata) -> FileMetadata {
    let modified_at = metadata
        .modified()
        .ok()
        .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_secs() as i64);

    FileMetadata {
        size: metadata.len(),
        modified_at,
        is_directory: metadata.is_dir(),
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(fs::try_exists(path).await?)
    }

    async fn metadata(&self, path: &Path) -> Result<FileMetadata> {
        Ok(to_file_metadata(fs::metadata(path).await?))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await?;
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        Ok(Bytes::from(fs::read(path).await?))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let partial = Self::partial_path(path);
        fs::write(&partial, &data).await?;
        fs::rename(&partial, path).await?;
        debug!(path = ?path, bytes = data.len(), "File written");
        Ok(())
    }

    /// Entries sorted by path; `read_dir` order is platform dependent.
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut read_dir = fs::read_dir(path).await?;
        let mut entries = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            entries.push(entry.path());
        }
        entries.sort();
        Ok(entries)
    }

    async fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).await?;
        debug!(from = ?from, to = ?to, "File moved");
        Ok(())
    }
}
