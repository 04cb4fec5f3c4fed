//! # Reconciliation Configuration
//!
//! Provides configuration management for a reconciliation run.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! `ReconcileConfig` holding the two library roots, the persistence location,
//! polling parameters and every bridge the coordinator needs. It enforces
//! fail-fast validation so a run never starts with a missing capability or an
//! unsafe root layout.
//!
//! ## Required Dependencies
//!
//! - `RemoteCatalog` - Authoritative playlists and their tracks
//! - `TagReader` - Identity tags of local audio files
//!
//! ## Dependencies with desktop defaults
//!
//! - `FileSystemAccess` - desktop default: `TokioFileSystem`
//! - `LockBreaker` - desktop default: `ProcessLockBreaker` for the configured
//!   external application image name
//!
//! Desktop defaults are injected only when the `desktop-shims` feature is enabled.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::ReconcileConfig;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let config = ReconcileConfig::builder()
//!     .library_base("/music")
//!     .config_dir("/home/me/.shelfsync")
//!     .poll_interval(Duration::from_secs(5))
//!     .catalog(Arc::new(MyCatalog))
//!     .tag_reader(Arc::new(MyTagReader))
//!     .lock_breaker(Arc::new(MyLockBreaker))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{FileSystemAccess, LockBreaker, RemoteCatalog, TagReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Folder holding the authoritative library under a library base.
pub const AUTHORITATIVE_DIR_NAME: &str = "library";
/// Folder holding staged files under a library base.
pub const STAGING_DIR_NAME: &str = "library_staging";
/// File name of the persisted pending set inside the config directory.
pub const PENDING_SET_FILE_NAME: &str = "uncategorized.json";

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(600);
/// The remote catalog serves at most this many tracks per page.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Audio extensions considered during scans (lowercase, without dot).
pub const DEFAULT_AUDIO_EXTENSIONS: &[&str] = &[
    "mp3", "m4a", "flac", "wav", "ogg", "opus", "aac", "wma", "aiff", "alac",
];

/// Configuration for one reconciliation run.
///
/// Use [`ReconcileConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct ReconcileConfig {
    /// Root whose subfolders are the playlists (`<root>/<playlist>/<file>`)
    pub authoritative_root: PathBuf,

    /// Root mirroring the same layout for files awaiting re-sorting
    pub staging_root: PathBuf,

    /// Directory holding the persisted pending set
    pub config_dir: PathBuf,

    /// Delay between polling rounds
    pub poll_interval: Duration,

    /// Page size requested from the remote catalog
    pub page_size: u32,

    /// Lowercase extensions of files considered audio tracks
    pub audio_extensions: Vec<String>,

    /// Executable started again after a forced close
    pub relaunch_executable: Option<PathBuf>,

    pub file_system: Arc<dyn FileSystemAccess>,
    pub catalog: Arc<dyn RemoteCatalog>,
    pub tag_reader: Arc<dyn TagReader>,
    pub lock_breaker: Arc<dyn LockBreaker>,
}

impl std::fmt::Debug for ReconcileConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileConfig")
            .field("authoritative_root", &self.authoritative_root)
            .field("staging_root", &self.staging_root)
            .field("config_dir", &self.config_dir)
            .field("poll_interval", &self.poll_interval)
            .field("page_size", &self.page_size)
            .field("audio_extensions", &self.audio_extensions)
            .field("relaunch_executable", &self.relaunch_executable)
            .field("file_system", &"FileSystemAccess { ... }")
            .field("catalog", &"RemoteCatalog { ... }")
            .field("tag_reader", &"TagReader { ... }")
            .field("lock_breaker", &"LockBreaker { ... }")
            .finish()
    }
}

impl ReconcileConfig {
    /// Creates a new builder for constructing a `ReconcileConfig`.
    pub fn builder() -> ReconcileConfigBuilder {
        ReconcileConfigBuilder::default()
    }

    /// Location of the persisted pending set
    pub fn pending_set_path(&self) -> PathBuf {
        self.config_dir.join(PENDING_SET_FILE_NAME)
    }

    /// Whether `path` has one of the configured audio extensions
    pub fn is_audio_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.audio_extensions.iter().any(|allowed| *allowed == ext)
            })
            .unwrap_or(false)
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Roots and config directory are not empty
    /// - The two roots are distinct and neither contains the other
    /// - Poll interval is within (0, 10 min]
    /// - Page size is within 1..=100
    /// - At least one audio extension is configured
    pub fn validate(&self) -> Result<()> {
        if self.authoritative_root.as_os_str().is_empty() {
            return Err(Error::Config(
                "Authoritative root cannot be empty".to_string(),
            ));
        }

        if self.staging_root.as_os_str().is_empty() {
            return Err(Error::Config("Staging root cannot be empty".to_string()));
        }

        if self.config_dir.as_os_str().is_empty() {
            return Err(Error::Config("Config directory cannot be empty".to_string()));
        }

        if self.authoritative_root == self.staging_root {
            return Err(Error::Config(
                "Authoritative root and staging root must be different directories".to_string(),
            ));
        }

        if self.staging_root.starts_with(&self.authoritative_root)
            || self.authoritative_root.starts_with(&self.staging_root)
        {
            return Err(Error::Config(format!(
                "Roots must not be nested: {} / {}",
                self.authoritative_root.display(),
                self.staging_root.display()
            )));
        }

        if self.poll_interval.is_zero() {
            return Err(Error::Config(
                "Poll interval must be greater than zero".to_string(),
            ));
        }

        if self.poll_interval > MAX_POLL_INTERVAL {
            return Err(Error::Config(format!(
                "Poll interval exceeds maximum of {} seconds",
                MAX_POLL_INTERVAL.as_secs()
            )));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(Error::Config(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        if self.audio_extensions.is_empty() {
            return Err(Error::Config(
                "At least one audio extension is required".to_string(),
            ));
        }

        Ok(())
    }
}

fn catalog_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "RemoteCatalog".to_string(),
        message: "A RemoteCatalog implementation is required to read the authoritative \
                 playlists. Inject the host's catalog client with .catalog()."
            .to_string(),
    }
}

fn tag_reader_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "TagReader".to_string(),
        message: "A TagReader implementation is required to identify local files. \
                 Use core_metadata::LoftyTagReader or inject a platform reader with .tag_reader()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    use bridge_desktop::TokioFileSystem;

    let fs: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::new());
    Ok(fs)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_file_system() -> Result<Arc<dyn FileSystemAccess>> {
    Err(Error::CapabilityMissing {
        capability: "FileSystemAccess".to_string(),
        message: "FileSystemAccess implementation is required. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use TokioFileSystem."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_lock_breaker(image_name: Option<&str>) -> Result<Arc<dyn LockBreaker>> {
    use bridge_desktop::ProcessLockBreaker;

    let image_name = image_name.ok_or_else(lock_breaker_missing_error)?;
    let breaker: Arc<dyn LockBreaker> = Arc::new(ProcessLockBreaker::new(image_name));
    Ok(breaker)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_lock_breaker(_image_name: Option<&str>) -> Result<Arc<dyn LockBreaker>> {
    Err(lock_breaker_missing_error())
}

fn lock_breaker_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "LockBreaker".to_string(),
        message: "A LockBreaker is required to recover from files held open by another \
                 application. Desktop: set .external_app_image() with the 'desktop-shims' \
                 feature enabled. Otherwise inject one with .lock_breaker()."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn default_config_dir() -> Option<PathBuf> {
    Some(bridge_desktop::TokioFileSystem::default_config_dir())
}

#[cfg(not(feature = "desktop-shims"))]
fn default_config_dir() -> Option<PathBuf> {
    None
}

/// Builder for constructing [`ReconcileConfig`] instances.
#[derive(Default)]
pub struct ReconcileConfigBuilder {
    authoritative_root: Option<PathBuf>,
    staging_root: Option<PathBuf>,
    config_dir: Option<PathBuf>,
    poll_interval: Option<Duration>,
    page_size: Option<u32>,
    audio_extensions: Option<Vec<String>>,
    relaunch_executable: Option<PathBuf>,
    external_app_image: Option<String>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    catalog: Option<Arc<dyn RemoteCatalog>>,
    tag_reader: Option<Arc<dyn TagReader>>,
    lock_breaker: Option<Arc<dyn LockBreaker>>,
}

impl ReconcileConfigBuilder {
    /// Derives both roots from a common base directory:
    /// `<base>/library` and `<base>/library_staging`.
    pub fn library_base<P: AsRef<Path>>(mut self, base: P) -> Self {
        let base = base.as_ref();
        self.authoritative_root = Some(base.join(AUTHORITATIVE_DIR_NAME));
        self.staging_root = Some(base.join(STAGING_DIR_NAME));
        self
    }

    pub fn authoritative_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.authoritative_root = Some(path.into());
        self
    }

    pub fn staging_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.staging_root = Some(path.into());
        self
    }

    /// Directory for the persisted pending set (desktop default: `~/.shelfsync`)
    pub fn config_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_dir = Some(path.into());
        self
    }

    /// Delay between polling rounds (default: 5 seconds)
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Page size for remote track listings (default: 100)
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Replaces the audio extension list; entries are normalized to lowercase
    /// without a leading dot.
    pub fn audio_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.audio_extensions = Some(
            extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
        );
        self
    }

    /// Executable to start again after the external application was closed
    pub fn relaunch_executable<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.relaunch_executable = Some(path.into());
        self
    }

    /// Process image name of the external application (e.g. `Spotify.exe`),
    /// used to build the desktop default lock breaker.
    pub fn external_app_image(mut self, image_name: impl Into<String>) -> Self {
        self.external_app_image = Some(image_name.into());
        self
    }

    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    pub fn catalog(mut self, catalog: Arc<dyn RemoteCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn tag_reader(mut self, reader: Arc<dyn TagReader>) -> Self {
        self.tag_reader = Some(reader);
        self
    }

    pub fn lock_breaker(mut self, breaker: Arc<dyn LockBreaker>) -> Self {
        self.lock_breaker = Some(breaker);
        self
    }

    /// Builds the final `ReconcileConfig` instance.
    ///
    /// Returns an error if:
    /// - A root or the config directory is missing
    /// - A required bridge is missing and no desktop default applies
    /// - Validation fails
    pub fn build(self) -> Result<ReconcileConfig> {
        let authoritative_root = self.authoritative_root.ok_or_else(|| {
            Error::Config(
                "Authoritative root is required. Use .authoritative_root() or .library_base()."
                    .to_string(),
            )
        })?;

        let staging_root = self.staging_root.ok_or_else(|| {
            Error::Config(
                "Staging root is required. Use .staging_root() or .library_base().".to_string(),
            )
        })?;

        let config_dir = self.config_dir.or_else(default_config_dir).ok_or_else(|| {
            Error::Config("Config directory is required. Use .config_dir() to set it.".to_string())
        })?;

        let catalog = self.catalog.ok_or_else(catalog_missing_error)?;
        let tag_reader = self.tag_reader.ok_or_else(tag_reader_missing_error)?;

        let file_system = match self.file_system {
            Some(fs) => fs,
            None => provide_default_file_system()?,
        };

        let lock_breaker = match self.lock_breaker {
            Some(breaker) => breaker,
            None => provide_default_lock_breaker(self.external_app_image.as_deref())?,
        };

        let config = ReconcileConfig {
            authoritative_root,
            staging_root,
            config_dir,
            poll_interval: self.poll_interval.unwrap_or(DEFAULT_POLL_INTERVAL),
            page_size: self.page_size.unwrap_or(MAX_PAGE_SIZE),
            audio_extensions: self.audio_extensions.unwrap_or_else(|| {
                DEFAULT_AUDIO_EXTENSIONS
                    .iter()
                    .map(|ext| ext.to_string())
                    .collect()
            }),
            relaunch_executable: self.relaunch_executable,
            file_system,
            catalog,
            tag_reader,
            lock_breaker,
        };

        config.validate()?;

        Ok(config)
    }
}
