//! # Host Bridge Traits
//!
//! Collaborator contracts the reconciliation core depends on.
//!
//! ## Overview
//!
//! The core never touches the disk, the network or other processes directly.
//! Each capability is expressed as a trait here and implemented per host
//! (`bridge-desktop` for desktop platforms, fakes and mocks in tests).
//!
//! ## Traits
//!
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Directory listing, moves, small file I/O
//! - [`RemoteCatalog`](catalog::RemoteCatalog) - Authoritative playlists and their tracks
//! - [`TagReader`](tags::TagReader) - Title/artist/album extraction from audio files
//! - [`LockBreaker`](process::LockBreaker) - Releasing files held open by an external app
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability is
//! missing:
//!
//! ```ignore
//! let catalog = config.catalog
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "RemoteCatalog".to_string(),
//!         message: "No remote catalog client provided.".to_string(),
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits return [`BridgeError`](error::BridgeError). Implementations
//! convert platform errors into it and keep the context (paths, playlist ids)
//! in the message.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared across tasks
//! behind an `Arc`.

pub mod catalog;
pub mod error;
pub mod logging;
pub mod process;
pub mod storage;
pub mod tags;

pub use error::BridgeError;

pub use catalog::{RemoteCatalog, RemotePlaylist, RemoteTrack};
pub use logging::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use process::LockBreaker;
pub use storage::{FileMetadata, FileSystemAccess};
pub use tags::{TagReader, TrackTags};
