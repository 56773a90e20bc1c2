//! Stopping running processes

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Handle on a spawned process, valid while its task is running
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: u32,
    exited: watch::Receiver<bool>,
}

impl ProcessHandle {
    /// `exited` flips to `true` once the supervisor reaped the process
    pub fn new(pid: u32, exited: watch::Receiver<bool>) -> Self {
        Self { pid, exited }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn has_exited(&self) -> bool {
        *self.exited.borrow()
    }

    /// Wait until the process exited or `timeout` elapsed. Returns whether it exited.
    pub async fn wait_exit(&self, timeout: Duration) -> bool {
        let mut exited = self.exited.clone();
        let wait = async {
            while !*exited.borrow_and_update() {
                if exited.changed().await.is_err() {
                    // Supervisor gone: the process was reaped.
                    return;
                }
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

/// Result of a termination request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminateOutcome {
    Success,
    Failed(String),
}

/// Stops a process and its children
#[async_trait]
pub trait Terminator: Send + Sync {
    async fn terminate(&self, process: &ProcessHandle, cwd: &Path) -> TerminateOutcome;
}

/// Graceful-then-forced termination of the process group
#[derive(Debug, Clone)]
pub struct ProcessTerminator {
    grace: Duration,
}

impl ProcessTerminator {
    /// `grace` is how long the process may take to exit after the graceful signal
    pub fn new(grace: Duration) -> Self {
        Self { grace }
    }
}

impl Default for ProcessTerminator {
    fn default() -> Self {
        Self::new(Duration::from_millis(3000))
    }
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: libc::c_int) -> std::io::Result<()> {
    let pgid = -(pid as libc::pid_t);
    // SAFETY: kill has no memory-safety preconditions
    if unsafe { libc::kill(pgid, signal) } == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[async_trait]
impl Terminator for ProcessTerminator {
    #[cfg(unix)]
    async fn terminate(&self, process: &ProcessHandle, _cwd: &Path) -> TerminateOutcome {
        if process.has_exited() {
            return TerminateOutcome::Success;
        }

        if let Err(e) = signal_group(process.pid(), libc::SIGTERM) {
            if e.raw_os_error() == Some(libc::ESRCH) {
                return TerminateOutcome::Success;
            }
            return TerminateOutcome::Failed(format!("SIGTERM failed: {}", e));
        }
        debug!(pid = process.pid(), "sent SIGTERM");

        if process.wait_exit(self.grace).await {
            return TerminateOutcome::Success;
        }

        warn!(pid = process.pid(), "process ignored SIGTERM, killing");
        match signal_group(process.pid(), libc::SIGKILL) {
            Ok(()) => TerminateOutcome::Success,
            Err(e) if e.raw_os_error() == Some(libc::ESRCH) => TerminateOutcome::Success,
            Err(e) => TerminateOutcome::Failed(format!("SIGKILL failed: {}", e)),
        }
    }

    #[cfg(not(unix))]
    async fn terminate(&self, process: &ProcessHandle, cwd: &Path) -> TerminateOutcome {
        if process.has_exited() {
            return TerminateOutcome::Success;
        }

        let output = tokio::process::Command::new("taskkill")
            .args(["/PID", &process.pid().to_string(), "/T", "/F"])
            .current_dir(cwd)
            .output()
            .await;
        match output {
            Ok(output) if output.status.success() => TerminateOutcome::Success,
            Ok(output) => {
                if process.wait_exit(self.grace).await {
                    return TerminateOutcome::Success;
                }
                TerminateOutcome::Failed(String::from_utf8_lossy(&output.stderr).trim().to_string())
            }
            Err(e) => TerminateOutcome::Failed(format!("taskkill failed: {}", e)),
        }
    }
}
