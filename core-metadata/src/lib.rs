//! # Metadata Module
//!
//! Identifies local audio files by their embedded tags.
//!
//! ## Overview
//!
//! The reconciliation core matches files against remote playlists by title,
//! artist and album. This crate provides [`LoftyTagReader`], the default
//! [`TagReader`](bridge_traits::tags::TagReader), which reads those three
//! fields from ID3v2, Vorbis, MP4, FLAC and RIFF tags.

pub mod error;
pub mod extractor;

pub use error::{MetadataError, Result};
pub use extractor::LoftyTagReader;
