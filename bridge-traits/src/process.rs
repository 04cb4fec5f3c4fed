//! External Application Control
//!
//! Another program (typically the music player) may hold library files open.
//! The relocator asks a [`LockBreaker`] to release those handles before
//! retrying a failed move.

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

/// Strategy for releasing file locks held by an external application.
///
/// The desktop implementation terminates the application's processes; a host
/// may substitute a gentler strategy (asking the user, waiting, ...).
#[async_trait]
pub trait LockBreaker: Send + Sync {
    /// Release any handles the external application holds.
    ///
    /// `Ok(true)` if something was terminated, `Ok(false)` when nothing was
    /// running.
    async fn force_close(&self) -> Result<bool>;

    /// Start the external application again from its executable path
    async fn relaunch(&self, executable: &Path) -> Result<()>;
}
