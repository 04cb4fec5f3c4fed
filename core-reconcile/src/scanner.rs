//! Library scanning
//!
//! Every direct subfolder of a root is a playlist. Audio files anywhere below
//! it become records, identified by their tags and named by their path
//! relative to the playlist folder. Files whose tags cannot be read are left
//! out of the index and never moved.

use bridge_traits::{FileSystemAccess, TagReader};
use core_runtime::ReconcileConfig;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::model::{LibraryIndex, TrackRecord};
use crate::Result;

pub struct LibraryScanner {
    config: ReconcileConfig,
    fs: Arc<dyn FileSystemAccess>,
    tag_reader: Arc<dyn TagReader>,
}

impl LibraryScanner {
    pub fn new(config: &ReconcileConfig) -> Self {
        Self {
            config: config.clone(),
            fs: config.file_system.clone(),
            tag_reader: config.tag_reader.clone(),
        }
    }

    /// Index of the authoritative root. Empty playlist folders are kept as
    /// empty entries.
    #[instrument(skip(self))]
    pub async fn scan_authoritative(&self) -> Result<LibraryIndex> {
        self.scan_root(&self.config.authoritative_root, true).await
    }

    /// Index of the staging root. Playlists without files are dropped.
    #[instrument(skip(self))]
    pub async fn scan_staging(&self) -> Result<LibraryIndex> {
        self.scan_root(&self.config.staging_root, false).await
    }

    async fn scan_root(&self, root: &Path, keep_empty: bool) -> Result<LibraryIndex> {
        let mut index = LibraryIndex::new();

        if !self.fs.is_directory(root).await? {
            debug!(root = %root.display(), "Root does not exist yet");
            return Ok(index);
        }

        for entry in self.fs.list_directory(root).await? {
            if !self.fs.is_directory(&entry).await? {
                continue;
            }
            let Some(playlist) = entry.file_name().and_then(|n| n.to_str()) else {
                debug!(path = %entry.display(), "Skipping folder with non UTF-8 name");
                continue;
            };

            let records = self.scan_playlist(root, playlist).await?;
            if records.is_empty() && !keep_empty {
                continue;
            }
            index.insert(playlist.to_string(), records);
        }

        debug!(
            root = %root.display(),
            playlists = index.len(),
            "Root scanned"
        );
        Ok(index)
    }

    /// Records found below `<root>/<playlist>`, in path order.
    pub async fn scan_playlist(&self, root: &Path, playlist: &str) -> Result<Vec<TrackRecord>> {
        let folder = root.join(playlist);
        let mut records = Vec::new();

        for path in self.collect_audio_files(&folder).await? {
            let Ok(relative) = path.strip_prefix(&folder) else {
                continue;
            };
            let file_name = relative.to_string_lossy().into_owned();

            match self.tag_reader.read_tags(&path).await {
                Ok(tags) => records.push(TrackRecord::from_tags(tags, playlist, file_name)),
                Err(e) => {
                    debug!(playlist, file = %file_name, error = %e, "Skipping unreadable file");
                }
            }
        }

        Ok(records)
    }

    async fn collect_audio_files(&self, folder: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        if !self.fs.is_directory(folder).await? {
            return Ok(files);
        }

        let mut pending = VecDeque::from([folder.to_path_buf()]);
        while let Some(dir) = pending.pop_front() {
            for entry in self.fs.list_directory(&dir).await? {
                if self.fs.is_directory(&entry).await? {
                    pending.push_back(entry);
                } else if self.config.is_audio_file(&entry) {
                    files.push(entry);
                }
            }
        }

        files.sort();
        Ok(files)
    }
}
