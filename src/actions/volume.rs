//! Output mixer control via platform commands

use async_trait::async_trait;

use crate::actions::VolumeControl;
use crate::{Error, Result};

/// Mixer control backed by `pactl` on Linux and `osascript` on macOS
#[derive(Debug, Default)]
pub struct SystemVolume;

impl SystemVolume {
    /// Create a new system mixer controller
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

async fn command_output(program: &str, args: &[&str]) -> Result<String> {
    let output = tokio::process::Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| Error::Volume(format!("failed to run {program}: {e}")))?;
    if !output.status.success() {
        return Err(Error::Volume(format!(
            "{program} exited with {}",
            output.status
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// First percentage token in mixer output, e.g. "45%" in
/// "Volume: front-left: 29491 /  45% / ..."
fn parse_percent(output: &str) -> Option<u8> {
    output
        .split_whitespace()
        .find_map(|token| token.strip_suffix('%'))
        .and_then(|p| p.parse::<u8>().ok())
        .map(|p| p.min(100))
}

#[async_trait]
impl VolumeControl for SystemVolume {
    async fn volume(&self) -> Result<u8> {
        #[cfg(target_os = "linux")]
        {
            let output =
                command_output("pactl", &["get-sink-volume", "@DEFAULT_SINK@"]).await?;
            parse_percent(&output)
                .ok_or_else(|| Error::Volume("no percentage in pactl output".to_string()))
        }

        #[cfg(target_os = "macos")]
        {
            let output = command_output(
                "osascript",
                &["-e", "output volume of (get volume settings)"],
            )
            .await?;
            output
                .trim()
                .parse::<u8>()
                .map(|p| p.min(100))
                .map_err(|e| Error::Volume(format!("bad osascript output: {e}")))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        Err(Error::Volume(
            "volume control not supported on this platform".to_string(),
        ))
    }

    async fn set_volume(&self, percent: u8) -> Result<()> {
        let percent = percent.min(100);

        #[cfg(target_os = "linux")]
        {
            command_output(
                "pactl",
                &["set-sink-volume", "@DEFAULT_SINK@", &format!("{percent}%")],
            )
            .await?;
            tracing::info!(percent, "volume set");
            Ok(())
        }

        #[cfg(target_os = "macos")]
        {
            command_output(
                "osascript",
                &["-e", &format!("set volume output volume {percent}")],
            )
            .await?;
            tracing::info!(percent, "volume set");
            Ok(())
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            let _ = percent;
            Err(Error::Volume(
                "volume control not supported on this platform".to_string(),
            ))
        }
    }

    async fn toggle_mute(&self) -> Result<bool> {
        #[cfg(target_os = "linux")]
        {
            command_output("pactl", &["set-sink-mute", "@DEFAULT_SINK@", "toggle"]).await?;
            let output = command_output("pactl", &["get-sink-mute", "@DEFAULT_SINK@"]).await?;
            let muted = output.contains("yes");
            tracing::info!(muted, "mute toggled");
            Ok(muted)
        }

        #[cfg(target_os = "macos")]
        {
            let output = command_output(
                "osascript",
                &["-e", "output muted of (get volume settings)"],
            )
            .await?;
            let muted = !output.trim().eq_ignore_ascii_case("true");
            command_output(
                "osascript",
                &["-e", &format!("set volume output muted {muted}")],
            )
            .await?;
            tracing::info!(muted, "mute toggled");
            Ok(muted)
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        Err(Error::Volume(
            "volume control not supported on this platform".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_parsed_from_pactl_output() {
        let output = "Volume: front-left: 29491 /  45% / -20.83 dB";
        assert_eq!(parse_percent(output), Some(45));
    }

    #[test]
    fn oversized_percent_is_clamped() {
        assert_eq!(parse_percent("Volume: 153% boosted"), Some(100));
    }

    #[test]
    fn missing_percent_yields_none() {
        assert_eq!(parse_percent("Volume: unknown"), None);
    }
}
