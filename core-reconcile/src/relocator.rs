//! # File Relocator
//!
//! Moves one track file between the authoritative and staging roots.
//!
//! A move is a rename from `<from_root>/<playlist>/<file_name>` to
//! `<to_root>/<playlist>/<file_name>`. When the rename fails, the external
//! application that may hold the file open is closed through the
//! [`LockBreaker`] and the rename is retried exactly once.
//!
//! An existing destination is never overwritten. The move is a no-op
//! ([`RelocationOutcome::AlreadyPresent`]) only when the destination already
//! holds the same track: either the file at the destination path matches the
//! record, or the source is gone and a matching file sits in the destination
//! folder. A destination path taken by a different track is a name collision
//! and fails the move.

use bridge_traits::{FileSystemAccess, LockBreaker, TagReader};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::matcher::records_match;
use crate::model::TrackRecord;
use crate::{ReconcileError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocationOutcome {
    Moved,
    /// The first rename failed; it succeeded after the external app was closed
    MovedAfterForceClose,
    /// Nothing to do, the file is already at the destination
    AlreadyPresent,
}

impl RelocationOutcome {
    pub fn moved(&self) -> bool {
        !matches!(self, RelocationOutcome::AlreadyPresent)
    }
}

pub struct FileRelocator {
    fs: Arc<dyn FileSystemAccess>,
    tag_reader: Arc<dyn TagReader>,
    lock_breaker: Arc<dyn LockBreaker>,
    forced_closes: AtomicU64,
}

impl FileRelocator {
    pub fn new(
        fs: Arc<dyn FileSystemAccess>,
        tag_reader: Arc<dyn TagReader>,
        lock_breaker: Arc<dyn LockBreaker>,
    ) -> Self {
        Self {
            fs,
            tag_reader,
            lock_breaker,
            forced_closes: AtomicU64::new(0),
        }
    }

    /// Number of times the external application was actually terminated
    pub fn forced_closes(&self) -> u64 {
        self.forced_closes.load(Ordering::Relaxed)
    }

    /// Move `record` from `from_root` to `to_root` under `playlist`.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::Structural`] if the destination folder cannot be created
    /// - [`ReconcileError::RelocationFailed`] if the source is missing, the
    ///   destination path holds a different track, or the rename fails twice
    pub async fn relocate(
        &self,
        record: &TrackRecord,
        from_root: &Path,
        to_root: &Path,
        playlist: &str,
    ) -> Result<RelocationOutcome> {
        let source = record.path_under(from_root, playlist);
        let dest = record.path_under(to_root, playlist);
        let dest_dir = dest.parent().unwrap_or(to_root);

        self.fs
            .create_dir_all(dest_dir)
            .await
            .map_err(|e| ReconcileError::Structural {
                path: dest_dir.display().to_string(),
                message: e.to_string(),
            })?;

        if self.fs.exists(&dest).await? {
            if self.holds_record(&dest, record).await {
                debug!(playlist, file = %record.file_name, "Destination already holds this track");
                return Ok(RelocationOutcome::AlreadyPresent);
            }
            return Err(self.failure(
                record,
                playlist,
                format!("{} is taken by a different track", dest.display()),
            ));
        }

        if !self.fs.exists(&source).await? {
            if self.identity_present(record, dest_dir).await? {
                debug!(playlist, file = %record.file_name, "Track already relocated");
                return Ok(RelocationOutcome::AlreadyPresent);
            }
            return Err(self.failure(record, playlist, "source file no longer exists"));
        }

        let first_error = match self.fs.rename(&source, &dest).await {
            Ok(()) => {
                debug!(playlist, file = %record.file_name, "Moved");
                return Ok(RelocationOutcome::Moved);
            }
            Err(e) => e,
        };

        warn!(
            playlist,
            file = %record.file_name,
            error = %first_error,
            "Move failed, closing external application and retrying"
        );
        match self.lock_breaker.force_close().await {
            Ok(true) => {
                self.forced_closes.fetch_add(1, Ordering::Relaxed);
            }
            Ok(false) => debug!("External application was not running"),
            Err(e) => warn!(error = %e, "Could not close external application"),
        }

        match self.fs.rename(&source, &dest).await {
            Ok(()) => {
                info!(playlist, file = %record.file_name, "Moved after closing external application");
                Ok(RelocationOutcome::MovedAfterForceClose)
            }
            Err(e) => Err(self.failure(record, playlist, e.to_string())),
        }
    }

    async fn identity_present(&self, record: &TrackRecord, dir: &Path) -> Result<bool> {
        if !self.fs.is_directory(dir).await? {
            return Ok(false);
        }

        for entry in self.fs.list_directory(dir).await? {
            if self.fs.is_directory(&entry).await? {
                continue;
            }
            if self.holds_record(&entry, record).await {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether the file at `path` carries the identity of `record`.
    /// Unreadable tags never match.
    async fn holds_record(&self, path: &Path, record: &TrackRecord) -> bool {
        match self.tag_reader.read_tags(path).await {
            Ok(tags) => records_match(&TrackRecord::from_tags(tags, "", ""), record),
            Err(_) => false,
        }
    }

    fn failure(
        &self,
        record: &TrackRecord,
        playlist: &str,
        message: impl Into<String>,
    ) -> ReconcileError {
        ReconcileError::RelocationFailed {
            playlist: playlist.to_string(),
            file_name: record.file_name.clone(),
            message: message.into(),
        }
    }
}
