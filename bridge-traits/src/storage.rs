//! File System Abstractions
//!
//! Provides the platform-agnostic file I/O trait the reconciliation core uses to
//! scan library roots, move audio files between them and persist the pending set.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// Abstracts file I/O so the reconciliation core can run against the real disk
/// on desktop and against in-memory fakes in tests.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn stage(fs: &dyn FileSystemAccess, from: &Path, to: &Path) -> Result<()> {
///     if let Some(parent) = to.parent() {
///         fs.create_dir_all(parent).await?;
///     }
///     fs.rename(from, to).await
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating it if it doesn't exist
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// List all entries in a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Move a file to a new location.
    ///
    /// Fails if the source is held open by another process on platforms that
    /// lock open files; callers decide how to recover.
    async fn rename(&self, from: &Path, to: &Path) -> Result<()>;

    /// Check whether the path exists and is a directory
    async fn is_directory(&self, path: &Path) -> Result<bool> {
        if !self.exists(path).await? {
            return Ok(false);
        }
        Ok(self.metadata(path).await?.is_directory)
    }
}
