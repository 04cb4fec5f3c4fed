//! Lock recovery by terminating the external application

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    process::LockBreaker,
};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Exit code of `taskkill` when no process matched the image name.
#[cfg(windows)]
const NOT_RUNNING_EXIT_CODE: i32 = 128;
/// Exit code of `pkill` when no process matched the name.
#[cfg(not(windows))]
const NOT_RUNNING_EXIT_CODE: i32 = 1;

const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// [`LockBreaker`] that force-terminates processes by image name.
///
/// Uses `taskkill /F /IM` on Windows and `pkill -f` elsewhere. `pkill -x`
/// only sees the 15-byte kernel `comm` name on Linux, so longer image names
/// are matched against the full command line instead: the image name must
/// be the executable's last path component. After a successful kill it waits
/// `settle_delay` so the OS can release the file handles before the caller
/// retries.
pub struct ProcessLockBreaker {
    image_names: Vec<String>,
    settle_delay: Duration,
}

impl ProcessLockBreaker {
    pub fn new(image_name: impl Into<String>) -> Self {
        Self {
            image_names: vec![image_name.into()],
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Also terminate helper processes sharing the file handles
    pub fn with_image_name(mut self, image_name: impl Into<String>) -> Self {
        self.image_names.push(image_name.into());
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn image_names(&self) -> &[String] {
        &self.image_names
    }

    #[cfg(windows)]
    fn kill_command(image_name: &str) -> Command {
        let mut command = Command::new("taskkill");
        command.args(["/F", "/IM", image_name]);
        command
    }

    #[cfg(not(windows))]
    fn kill_command(image_name: &str) -> Command {
        let mut command = Command::new("pkill");
        command.arg("-f").arg(Self::command_line_pattern(image_name));
        command
    }

    /// Extended regex matching a command line whose executable is `image_name`
    #[cfg_attr(windows, allow(dead_code))]
    fn command_line_pattern(image_name: &str) -> String {
        let mut escaped = String::with_capacity(image_name.len());
        for c in image_name.chars() {
            if "\\.^$|?*+()[]{}".contains(c) {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        format!("(^|/){escaped}( |$)")
    }

    fn is_not_running(code: Option<i32>) -> bool {
        code == Some(NOT_RUNNING_EXIT_CODE)
    }

    fn map_spawn_error(tool: &str, e: std::io::Error) -> BridgeError {
        if e.kind() == std::io::ErrorKind::NotFound {
            BridgeError::NotAvailable(format!("{tool} not found on PATH"))
        } else {
            BridgeError::Io(e)
        }
    }
}

#[async_trait]
impl LockBreaker for ProcessLockBreaker {
    async fn force_close(&self) -> Result<bool> {
        let mut terminated = false;

        for image_name in &self.image_names {
            let output = Self::kill_command(image_name)
                .stdin(Stdio::null())
                .output()
                .await
                .map_err(|e| Self::map_spawn_error("process kill tool", e))?;

            if output.status.success() {
                info!(image = %image_name, "Terminated external application");
                terminated = true;
            } else if Self::is_not_running(output.status.code()) {
                debug!(image = %image_name, "External application not running");
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(image = %image_name, status = ?output.status.code(), stderr = %stderr.trim(), "Failed to terminate external application");
                return Err(BridgeError::OperationFailed(format!(
                    "could not terminate {image_name}: {}",
                    stderr.trim()
                )));
            }
        }

        if terminated {
            tokio::time::sleep(self.settle_delay).await;
        }
        Ok(terminated)
    }

    async fn relaunch(&self, executable: &Path) -> Result<()> {
        let child = Command::new(executable)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Self::map_spawn_error(&executable.display().to_string(), e))?;

        info!(executable = ?executable, pid = ?child.id(), "Relaunched external application");
        Ok(())
    }
}
