//! # Pending Set
//!
//! Playlist name to the tracks still awaiting manual re-sorting. This is the
//! document the presentation layer reads and a restarted coordinator resumes
//! from. It is stored as JSON:
//!
//! ```json
//! {
//!   "Chill": [
//!     { "title": "Ocean", "artist": "X", "album": "Y", "fileName": "a.mp3" }
//!   ]
//! }
//! ```
//!
//! Playlists without tracks are never stored.

use bridge_traits::FileSystemAccess;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::model::{LibraryIndex, TrackRecord};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTrack {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub file_name: String,
}

impl PendingTrack {
    pub fn to_record(&self, playlist_name: &str) -> TrackRecord {
        TrackRecord::new(&self.title, &self.artist, &self.album)
            .with_playlist(playlist_name)
            .with_file_name(&self.file_name)
    }
}

impl From<&TrackRecord> for PendingTrack {
    fn from(record: &TrackRecord) -> Self {
        Self {
            title: record.title.clone(),
            artist: record.artist.clone(),
            album: record.album.clone(),
            file_name: record.file_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingSet {
    playlists: BTreeMap<String, Vec<PendingTrack>>,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_index(index: &LibraryIndex) -> Self {
        let mut set = Self::new();
        for (playlist, records) in index {
            set.extend(playlist, records);
        }
        set
    }

    /// Append records under `playlist`. Nothing is stored for an empty slice.
    pub fn extend<'a, I>(&mut self, playlist: &str, records: I)
    where
        I: IntoIterator<Item = &'a TrackRecord>,
    {
        let tracks: Vec<PendingTrack> = records.into_iter().map(PendingTrack::from).collect();
        if tracks.is_empty() {
            return;
        }
        self.playlists
            .entry(playlist.to_string())
            .or_default()
            .extend(tracks);
    }

    pub fn get(&self, playlist: &str) -> Option<&[PendingTrack]> {
        self.playlists.get(playlist).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty()
    }

    pub fn playlist_count(&self) -> usize {
        self.playlists.len()
    }

    pub fn track_count(&self) -> usize {
        self.playlists.values().map(Vec::len).sum()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let set: Self = serde_json::from_str(json)?;
        Ok(set.without_empty())
    }

    /// Read a previously saved set; `Ok(None)` when no file exists yet.
    pub async fn load(fs: &dyn FileSystemAccess, path: &Path) -> Result<Option<Self>> {
        if !fs.exists(path).await? {
            debug!(path = %path.display(), "No persisted pending set");
            return Ok(None);
        }

        let data = fs.read_file(path).await?;
        let set: Self = serde_json::from_slice(&data)?;
        Ok(Some(set.without_empty()))
    }

    /// Write the set, creating the parent directory if needed.
    pub async fn save(&self, fs: &dyn FileSystemAccess, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs.create_dir_all(parent).await?;
        }
        let json = self.to_json()?;
        fs.write_file(path, Bytes::from(json)).await?;
        debug!(
            path = %path.display(),
            playlists = self.playlist_count(),
            tracks = self.track_count(),
            "Pending set saved"
        );
        Ok(())
    }

    fn without_empty(mut self) -> Self {
        self.playlists.retain(|_, tracks| !tracks.is_empty());
        self
    }
}
