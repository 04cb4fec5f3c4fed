//! Remote Catalog Abstractions
//!
//! The remote catalog is the authoritative source of the organization scheme:
//! a list of named playlists, each listing tracks by title, artist and album.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A playlist as defined by the remote catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePlaylist {
    pub id: String,
    pub name: String,
}

impl RemotePlaylist {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A track entry of a remote playlist.
///
/// Only locally-backed entries are returned; `artist` carries the first
/// credited artist and is `None` when the catalog lists none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTrack {
    pub title: String,
    pub artist: Option<String>,
    pub album: String,
}

impl RemoteTrack {
    pub fn new(
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            artist: Some(artist.into()),
            album: album.into(),
        }
    }
}

/// Remote catalog client trait
///
/// Implementations own transport, pagination and rate limiting. A rejected
/// credential must surface as [`BridgeError::SessionInvalid`](crate::BridgeError::SessionInvalid)
/// so the caller can tell it apart from a transient failure.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::catalog::RemoteCatalog;
///
/// async fn count(catalog: &dyn RemoteCatalog, token: &str) -> Result<usize> {
///     let mut total = 0;
///     for playlist in catalog.fetch_playlists(token).await? {
///         total += catalog.fetch_playlist_tracks(token, &playlist.id, 100).await?.len();
///     }
///     Ok(total)
/// }
/// ```
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    /// Fetch every playlist owned by the session's user
    async fn fetch_playlists(&self, access_token: &str) -> Result<Vec<RemotePlaylist>>;

    /// Fetch the full track list of one playlist.
    ///
    /// `page_size` bounds each underlying request; the returned list is the
    /// concatenation of all pages.
    async fn fetch_playlist_tracks(
        &self,
        access_token: &str,
        playlist_id: &str,
        page_size: u32,
    ) -> Result<Vec<RemoteTrack>>;
}
