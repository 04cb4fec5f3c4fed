//! Audio tag reading

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::Result;

/// Identity tags read from an audio file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: String,
}

/// Reads title/artist/album from an audio file.
///
/// Missing individual tags are returned as empty strings. A file that cannot
/// be parsed at all is an error.
#[async_trait]
pub trait TagReader: Send + Sync {
    async fn read_tags(&self, path: &Path) -> Result<TrackTags>;
}
