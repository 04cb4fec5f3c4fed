//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `FileSystemAccess` using `tokio::fs`
//! - `LockBreaker` using the platform's process kill tool
//!
//! The remote catalog client and tag reader live in their own crates; the
//! host wires them together with these adapters.
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ProcessLockBreaker, TokioFileSystem};
//!
//! #[tokio::main]
//! async fn main() {
//!     let fs = TokioFileSystem::new();
//!     let lock_breaker = ProcessLockBreaker::new("Spotify.exe");
//!
//!     // Use in reconcile configuration
//! }
//! ```

mod filesystem;
mod process;

pub use filesystem::TokioFileSystem;
pub use process::ProcessLockBreaker;
