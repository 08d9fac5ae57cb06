//! Clock helper windows
//!
//! The helper is a local HTML page opened in a browser with its mode
//! and ring parameters in the query string. Launched processes are
//! tracked so CLOSE CLOCK APP can terminate them; a window that
//! ignores the polite signal is left running rather than killed.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Child;
use tokio::sync::Mutex;

use crate::actions::{ClockDisplay, ClockLaunch};
use crate::{Error, Result};

/// How long to wait for a helper window to exit after signalling
const CLOSE_GRACE: Duration = Duration::from_secs(5);
const CLOSE_POLL: Duration = Duration::from_millis(200);

/// Browser-hosted clock helper
pub struct SystemClockDisplay {
    page: PathBuf,
    opener: String,
    children: Mutex<Vec<Child>>,
}

impl SystemClockDisplay {
    /// Create a display over the helper page path and opener command
    #[must_use]
    pub fn new(page: PathBuf, opener: impl Into<String>) -> Self {
        Self {
            page,
            opener: opener.into(),
            children: Mutex::new(Vec::new()),
        }
    }

    fn page_uri(&self, params: &ClockLaunch) -> Result<String> {
        if !self.page.exists() {
            return Err(Error::Clock(format!(
                "helper page not found at {}",
                self.page.display()
            )));
        }

        let mut query = format!("mode={}", params.mode.as_str());
        if let Some(duration) = params.duration_secs {
            query.push_str(&format!("&duration={duration}"));
        }
        if let Some(time) = &params.target_time {
            query.push_str(&format!("&time={}", urlencoding::encode(time)));
        }

        Ok(format!("file://{}?{query}", self.page.display()))
    }
}

#[async_trait]
impl ClockDisplay for SystemClockDisplay {
    async fn launch(&self, params: ClockLaunch) -> Result<()> {
        let uri = self.page_uri(&params)?;
        tracing::info!(mode = params.mode.as_str(), uri = %uri, "launching clock helper");

        let child = tokio::process::Command::new(&self.opener)
            .arg(&uri)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| Error::Clock(format!("failed to launch {}: {e}", self.opener)))?;

        self.children.lock().await.push(child);
        Ok(())
    }

    async fn close_all(&self) -> Result<usize> {
        let mut children = std::mem::take(&mut *self.children.lock().await);
        let mut closed = 0;

        for child in &mut children {
            let Some(pid) = child.id() else {
                // Already exited.
                closed += 1;
                continue;
            };

            terminate(pid)?;

            let mut waited = Duration::ZERO;
            loop {
                match child.try_wait() {
                    Ok(Some(_)) => {
                        closed += 1;
                        break;
                    }
                    Ok(None) if waited < CLOSE_GRACE => {
                        tokio::time::sleep(CLOSE_POLL).await;
                        waited += CLOSE_POLL;
                    }
                    Ok(None) => {
                        tracing::warn!(pid, "clock helper ignored terminate, leaving it running");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(pid, error = %e, "failed to reap clock helper");
                        break;
                    }
                }
            }
        }

        tracing::info!(closed, "clock helpers closed");
        Ok(closed)
    }
}

#[cfg(unix)]
fn terminate(pid: u32) -> Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let pid = i32::try_from(pid).map_err(|_| Error::Clock(format!("pid {pid} out of range")))?;
    match kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) | Err(nix::errno::Errno::ESRCH) => Ok(()),
        Err(e) => Err(Error::Clock(format!("failed to signal pid {pid}: {e}"))),
    }
}

#[cfg(not(unix))]
fn terminate(_pid: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use crate::actions::{ClockLaunch, ClockMode};

    use super::*;

    fn display_with_page() -> (tempfile::NamedTempFile, SystemClockDisplay) {
        let mut page = tempfile::NamedTempFile::new().unwrap();
        writeln!(page, "<html></html>").unwrap();
        let display = SystemClockDisplay::new(page.path().to_path_buf(), "true");
        (page, display)
    }

    #[test]
    fn uri_carries_mode_and_parameters() {
        let (_page, display) = display_with_page();
        let uri = display
            .page_uri(&ClockLaunch {
                mode: ClockMode::Timer,
                duration_secs: Some(90),
                target_time: Some("05:30:00 PM".to_string()),
            })
            .unwrap();
        assert!(uri.starts_with("file://"));
        assert!(uri.contains("mode=timer"));
        assert!(uri.contains("duration=90"));
        assert!(uri.contains("time=05%3A30%3A00%20PM"));
    }

    #[test]
    fn plain_clock_face_has_no_ring_parameters() {
        let (_page, display) = display_with_page();
        let uri = display.page_uri(&ClockLaunch::clock_face()).unwrap();
        assert!(uri.contains("mode=clock"));
        assert!(!uri.contains("duration="));
        assert!(!uri.contains("time="));
    }

    #[test]
    fn missing_page_is_an_error() {
        let display =
            SystemClockDisplay::new(PathBuf::from("/nonexistent/clock.html"), "true");
        assert!(display.page_uri(&ClockLaunch::clock_face()).is_err());
    }

    #[tokio::test]
    async fn close_all_with_nothing_tracked_is_zero() {
        let (_page, display) = display_with_page();
        assert_eq!(display.close_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn launched_helpers_are_tracked_and_closed() {
        let (_page, display) = display_with_page();
        display.launch(ClockLaunch::clock_face()).await.unwrap();
        display.launch(ClockLaunch::clock_face()).await.unwrap();
        let closed = display.close_all().await.unwrap();
        assert_eq!(closed, 2);
    }
}
