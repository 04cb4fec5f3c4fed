//! Audio Tag Extraction
//!
//! Reads the identity tags (title, artist, album) of local audio files using
//! the `lofty` crate. Supports ID3v2, Vorbis Comments, MP4 atoms, RIFF INFO
//! and the other formats lofty can probe.
//!
//! ## Usage
//!
//! ```ignore
//! use core_metadata::LoftyTagReader;
//! use std::path::Path;
//!
//! let reader = LoftyTagReader::new();
//! let tags = reader.extract(Path::new("song.mp3")).await?;
//! println!("{} - {}", tags.artist, tags.title);
//! ```

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::tags::{TagReader, TrackTags};
use lofty::config::ParseOptions;
use lofty::file::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::Accessor;
use std::io::ErrorKind;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::error::{MetadataError, Result};

/// [`TagReader`] backed by `lofty`.
pub struct LoftyTagReader {
    parse_options: ParseOptions,
}

impl LoftyTagReader {
    pub fn new() -> Self {
        // Audio properties are not needed for identity tags
        Self {
            parse_options: ParseOptions::new().read_properties(false),
        }
    }

    pub fn with_options(parse_options: ParseOptions) -> Self {
        Self { parse_options }
    }

    /// Extract identity tags from an audio file.
    ///
    /// The primary tag of the format is preferred, falling back to the first
    /// tag present. Missing fields come back as empty strings; a file without
    /// any tag yields three empty fields.
    ///
    /// # Errors
    ///
    /// - [`MetadataError::FileNotFound`] if the file does not exist
    /// - [`MetadataError::ExtractionFailed`] if the format cannot be probed
    /// - [`MetadataError::CorruptedFile`] if probing succeeds but parsing fails
    pub async fn extract(&self, path: &Path) -> Result<TrackTags> {
        debug!(path = ?path, "Reading tags");

        let file_data = fs::read(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => MetadataError::FileNotFound(path.display().to_string()),
            _ => MetadataError::ExtractionFailed(format!("Failed to read file: {}", e)),
        })?;

        let tagged_file = Probe::new(std::io::Cursor::new(&file_data))
            .options(self.parse_options)
            .guess_file_type()
            .map_err(|e| MetadataError::ExtractionFailed(format!("Failed to probe file: {}", e)))?
            .read()
            .map_err(|e| MetadataError::CorruptedFile(format!("{}: {}", path.display(), e)))?;

        let tag = match tagged_file.primary_tag() {
            Some(primary_tag) => Some(primary_tag),
            None => tagged_file.first_tag(),
        };

        let Some(tag) = tag else {
            debug!(path = ?path, "File carries no tags");
            return Ok(TrackTags::default());
        };

        Ok(TrackTags {
            title: tag
                .title()
                .map(|s| Self::normalize_text(s.as_ref()))
                .unwrap_or_default(),
            artist: tag
                .artist()
                .map(|s| Self::normalize_text(s.as_ref()))
                .unwrap_or_default(),
            album: tag
                .album()
                .map(|s| Self::normalize_text(s.as_ref()))
                .unwrap_or_default(),
        })
    }

    /// Normalize text metadata
    ///
    /// - Trims leading/trailing whitespace
    /// - Normalizes consecutive whitespace to single space
    /// - Removes null bytes and control characters
    fn normalize_text(text: &str) -> String {
        text.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .chars()
            .filter(|c| !c.is_control())
            .collect()
    }
}

impl Default for LoftyTagReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TagReader for LoftyTagReader {
    async fn read_tags(&self, path: &Path) -> BridgeResult<TrackTags> {
        Ok(self.extract(path).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(
            LoftyTagReader::normalize_text("  Hello   World  "),
            "Hello World"
        );
        assert_eq!(
            LoftyTagReader::normalize_text("Title\nWith\tWhitespace"),
            "Title With Whitespace"
        );
        assert_eq!(LoftyTagReader::normalize_text("Padded\0"), "Padded");
    }
}
