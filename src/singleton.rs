//! Single-instance enforcement
//!
//! A pid file in the user runtime directory records the live agent.
//! A newer instance always wins: if the recorded pid is still
//! running it is sent SIGTERM and given a moment to exit before the
//! pid file is taken over.

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// How long to wait for a terminated predecessor to exit
const TAKEOVER_GRACE: Duration = Duration::from_secs(2);
const TAKEOVER_POLL: Duration = Duration::from_millis(100);

/// Holds the pid file for the process lifetime
///
/// The file is removed on drop; a crashed process leaves a stale
/// file behind, which the liveness probe handles on next start.
pub struct SingletonGuard {
    path: PathBuf,
}

impl Drop for SingletonGuard {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!(path = %self.path.display(), error = %e, "pid file cleanup failed");
        }
    }
}

fn pid_file_path() -> PathBuf {
    directories::BaseDirs::new()
        .and_then(|dirs| dirs.runtime_dir().map(std::path::Path::to_path_buf))
        .unwrap_or_else(std::env::temp_dir)
        .join("lucifer.pid")
}

/// Claim the single-instance slot, displacing an older instance
///
/// # Errors
///
/// Returns error if the pid file cannot be written or a live
/// predecessor refuses to exit within the grace period
pub async fn acquire() -> Result<SingletonGuard> {
    let path = pid_file_path();

    if let Some(pid) = read_recorded_pid(&path) {
        if is_running(pid) {
            tracing::info!(pid, "terminating previous instance");
            terminate(pid)?;
            let mut waited = Duration::ZERO;
            while is_running(pid) {
                if waited >= TAKEOVER_GRACE {
                    return Err(Error::Singleton(format!(
                        "previous instance (pid {pid}) did not exit"
                    )));
                }
                tokio::time::sleep(TAKEOVER_POLL).await;
                waited += TAKEOVER_POLL;
            }
        } else {
            tracing::debug!(pid, "stale pid file found");
        }
        let _ = std::fs::remove_file(&path);
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, std::process::id().to_string())?;
    tracing::debug!(path = %path.display(), pid = std::process::id(), "pid file written");

    Ok(SingletonGuard { path })
}

fn read_recorded_pid(path: &std::path::Path) -> Option<u32> {
    std::fs::read_to_string(path)
        .ok()?
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|&pid| pid != std::process::id())
}

#[cfg(unix)]
fn is_running(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    i32::try_from(pid).is_ok_and(|pid| kill(Pid::from_raw(pid), None).is_ok())
}

#[cfg(unix)]
fn terminate(pid: u32) -> Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let pid =
        i32::try_from(pid).map_err(|_| Error::Singleton(format!("pid {pid} out of range")))?;
    match kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(Error::Singleton(format!(
            "failed to signal pid {pid}: {e}"
        ))),
    }
}

#[cfg(not(unix))]
fn is_running(_pid: u32) -> bool {
    false
}

#[cfg(not(unix))]
fn terminate(_pid: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_pid_is_not_a_predecessor() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lucifer.pid");
        std::fs::write(&path, std::process::id().to_string()).unwrap();
        assert_eq!(read_recorded_pid(&path), None);
    }

    #[test]
    fn garbage_pid_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lucifer.pid");
        std::fs::write(&path, "not a pid").unwrap();
        assert_eq!(read_recorded_pid(&path), None);
    }

    #[test]
    fn missing_pid_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_recorded_pid(&dir.path().join("absent.pid")), None);
    }

    #[cfg(unix)]
    #[test]
    fn current_process_is_running() {
        assert!(is_running(std::process::id()));
    }
}
