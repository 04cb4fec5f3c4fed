//! Track identities and library indexes
//!
//! A [`TrackRecord`] is identified by title, artist and album. Local records
//! also carry the playlist folder they were found in and their file name
//! relative to that folder; remote records leave `file_name` empty.

use bridge_traits::{RemoteTrack, TrackTags};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRecord {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub playlist_name: String,
    pub file_name: String,
}

impl TrackRecord {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            playlist_name: String::new(),
            file_name: String::new(),
        }
    }

    /// Record for a file found on disk
    pub fn from_tags(
        tags: TrackTags,
        playlist_name: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            title: tags.title,
            artist: tags.artist,
            album: tags.album,
            playlist_name: playlist_name.into(),
            file_name: file_name.into(),
        }
    }

    /// Record for a remote track; `None` when the track has no artist.
    pub fn from_remote(track: RemoteTrack, playlist_name: &str) -> Option<Self> {
        let artist = track.artist?;
        Some(Self {
            title: track.title,
            artist,
            album: track.album,
            playlist_name: playlist_name.to_string(),
            file_name: String::new(),
        })
    }

    pub fn with_playlist(mut self, playlist_name: impl Into<String>) -> Self {
        self.playlist_name = playlist_name.into();
        self
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    pub fn is_local(&self) -> bool {
        !self.file_name.is_empty()
    }

    /// `<root>/<playlist>/<file_name>`
    pub fn path_under(&self, root: &Path, playlist: &str) -> PathBuf {
        root.join(playlist).join(&self.file_name)
    }
}

/// Playlist name to the multiset of records filed under it.
///
/// Used for both the authoritative library snapshot and the staging contents.
pub type LibraryIndex = BTreeMap<String, Vec<TrackRecord>>;

/// Number of records across all playlists of an index
pub fn record_count(index: &LibraryIndex) -> usize {
    index.values().map(Vec::len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_track_without_artist_is_skipped() {
        let track = RemoteTrack {
            title: "Interlude".to_string(),
            artist: None,
            album: "Live".to_string(),
        };
        assert!(TrackRecord::from_remote(track, "Chill").is_none());

        let record =
            TrackRecord::from_remote(RemoteTrack::new("Ocean", "X", "Y"), "Chill").unwrap();
        assert_eq!(record.playlist_name, "Chill");
        assert!(!record.is_local());
    }

    #[test]
    fn test_path_under_joins_nested_file_names() {
        let record = TrackRecord::new("Ocean", "X", "Y").with_file_name("disc1/a.mp3");
        let path = record.path_under(Path::new("/music/library"), "Chill");
        assert_eq!(path, PathBuf::from("/music/library/Chill/disc1/a.mp3"));
    }
}
