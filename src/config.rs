//! Agent configuration
//!
//! Settings live in a single JSON object at a fixed user-scoped path
//! and are layered: defaults, then the file, then environment
//! variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Speech-to-text backend settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SttSettings {
    /// Whisper-compatible transcription endpoint
    #[serde(default = "default_stt_url")]
    pub api_url: String,
    /// Bearer token, when the endpoint requires one
    #[serde(default)]
    pub api_key: Option<String>,
    /// Model name passed with each request
    #[serde(default = "default_stt_model")]
    pub model: String,
}

impl Default for SttSettings {
    fn default() -> Self {
        Self {
            api_url: default_stt_url(),
            api_key: None,
            model: default_stt_model(),
        }
    }
}

fn default_stt_url() -> String {
    "http://localhost:9000/v1/audio/transcriptions".to_string()
}

fn default_stt_model() -> String {
    "whisper-1".to_string()
}

fn default_opener() -> String {
    #[cfg(target_os = "macos")]
    return "open".to_string();

    #[cfg(not(target_os = "macos"))]
    "xdg-open".to_string()
}

fn default_true() -> bool {
    true
}

/// Agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Speech-to-text backend
    #[serde(default)]
    pub stt: SttSettings,
    /// Spoken app names mapped to launch commands
    #[serde(default)]
    pub apps: HashMap<String, String>,
    /// Path to the clock helper HTML page
    #[serde(default)]
    pub clock_page: Option<PathBuf>,
    /// Command used to open the clock helper page
    #[serde(default = "default_opener")]
    pub opener: String,
    /// Whether the global exit hotkey is armed
    #[serde(default = "default_true")]
    pub hotkey_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            stt: SttSettings::default(),
            apps: HashMap::new(),
            clock_page: None,
            opener: default_opener(),
            hotkey_enabled: true,
        }
    }
}

impl Settings {
    /// Default settings path under the user config directory
    #[must_use]
    pub fn default_path() -> PathBuf {
        directories::BaseDirs::new().map_or_else(
            || PathBuf::from(".lucifer/config.json"),
            |dirs| dirs.config_dir().join("lucifer").join("config.json"),
        )
    }

    /// Load settings from `path`, falling back to defaults when the
    /// file does not exist, then apply environment overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        let mut settings = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            serde_json::from_str(&contents)
                .map_err(|e| Error::Config(format!("invalid config at {}: {e}", path.display())))?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Persist settings to `path`, creating parent directories
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        tracing::debug!(path = %path.display(), "config saved");
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("LUCIFER_STT_URL") {
            self.stt.api_url = url;
        }
        if let Ok(key) = std::env::var("LUCIFER_STT_API_KEY") {
            self.stt.api_key = Some(key);
        }
        if let Ok(model) = std::env::var("LUCIFER_STT_MODEL") {
            self.stt.model = model;
        }
        if let Ok(page) = std::env::var("LUCIFER_CLOCK_PAGE") {
            self.clock_page = Some(PathBuf::from(page));
        }
    }

    /// Clock helper page path, defaulting next to the config file
    #[must_use]
    pub fn clock_page_path(&self) -> PathBuf {
        self.clock_page.clone().unwrap_or_else(|| {
            Self::default_path()
                .parent()
                .map_or_else(|| PathBuf::from("clock.html"), |p| p.join("clock.html"))
        })
    }
}
