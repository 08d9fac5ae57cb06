//! Power management via platform commands

use async_trait::async_trait;

use crate::actions::{BatteryReading, PowerControl};
use crate::{Error, Result};

/// Power control backed by the host's own tooling
///
/// Linux goes through `loginctl`, `systemctl`, and `shutdown`; macOS
/// through `pmset` and `osascript`. Battery state is read from sysfs
/// on Linux and `pmset -g batt` on macOS.
#[derive(Debug, Default)]
pub struct SystemPower;

impl SystemPower {
    /// Create a new system power controller
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

async fn run(program: &str, args: &[&str]) -> Result<()> {
    let status = tokio::process::Command::new(program)
        .args(args)
        .status()
        .await
        .map_err(|e| Error::Power(format!("failed to run {program}: {e}")))?;
    if status.success() {
        Ok(())
    } else {
        Err(Error::Power(format!("{program} exited with {status}")))
    }
}

/// Shutdown-style delay in whole minutes, with sub-minute delays
/// rounded up so "in 60 seconds" never becomes "now"
const fn delay_minutes(delay_secs: u64) -> u64 {
    delay_secs.div_ceil(60)
}

#[async_trait]
impl PowerControl for SystemPower {
    async fn lock(&self) -> Result<()> {
        #[cfg(target_os = "linux")]
        return run("loginctl", &["lock-session"]).await;

        #[cfg(target_os = "macos")]
        return run(
            "osascript",
            &["-e", r#"tell application "System Events" to keystroke "q" using {command down, control down}"#],
        )
        .await;

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        Err(Error::Power("lock not supported on this platform".to_string()))
    }

    async fn sleep(&self) -> Result<()> {
        #[cfg(target_os = "linux")]
        return run("systemctl", &["suspend"]).await;

        #[cfg(target_os = "macos")]
        return run("pmset", &["sleepnow"]).await;

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        Err(Error::Power("sleep not supported on this platform".to_string()))
    }

    async fn shutdown(&self, delay_secs: u64) -> Result<()> {
        let delay = format!("+{}", delay_minutes(delay_secs));
        tracing::warn!(delay_secs, "issuing shutdown");
        run("shutdown", &["-h", &delay]).await
    }

    async fn restart(&self, delay_secs: u64) -> Result<()> {
        let delay = format!("+{}", delay_minutes(delay_secs));
        tracing::warn!(delay_secs, "issuing restart");
        run("shutdown", &["-r", &delay]).await
    }

    async fn battery(&self) -> Result<Option<BatteryReading>> {
        #[cfg(target_os = "linux")]
        return read_sysfs_battery().await;

        #[cfg(target_os = "macos")]
        return read_pmset_battery().await;

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        Ok(None)
    }
}

#[cfg(target_os = "linux")]
async fn read_sysfs_battery() -> Result<Option<BatteryReading>> {
    let mut entries = match tokio::fs::read_dir("/sys/class/power_supply").await {
        Ok(entries) => entries,
        Err(_) => return Ok(None),
    };

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        if !name.to_string_lossy().starts_with("BAT") {
            continue;
        }
        let base = entry.path();
        let capacity = tokio::fs::read_to_string(base.join("capacity")).await?;
        let percent: u8 = capacity
            .trim()
            .parse()
            .map_err(|e| Error::Power(format!("bad capacity value: {e}")))?;
        let status = tokio::fs::read_to_string(base.join("status"))
            .await
            .unwrap_or_default();
        let plugged = matches!(status.trim(), "Charging" | "Full" | "Not charging");
        return Ok(Some(BatteryReading {
            percent: percent.min(100),
            plugged,
        }));
    }
    Ok(None)
}

#[cfg(target_os = "macos")]
async fn read_pmset_battery() -> Result<Option<BatteryReading>> {
    let output = tokio::process::Command::new("pmset")
        .args(["-g", "batt"])
        .output()
        .await
        .map_err(|e| Error::Power(format!("failed to run pmset: {e}")))?;
    let text = String::from_utf8_lossy(&output.stdout);

    let Some(percent) = text
        .split_whitespace()
        .find_map(|token| token.strip_suffix("%;"))
        .and_then(|p| p.parse::<u8>().ok())
    else {
        return Ok(None);
    };

    Ok(Some(BatteryReading {
        percent: percent.min(100),
        plugged: text.contains("AC Power"),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_minute_delay_rounds_up() {
        assert_eq!(delay_minutes(60), 1);
        assert_eq!(delay_minutes(30), 1);
        assert_eq!(delay_minutes(0), 0);
        assert_eq!(delay_minutes(120), 2);
        assert_eq!(delay_minutes(61), 2);
    }
}
