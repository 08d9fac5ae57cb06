//! Installed application catalog

use std::collections::HashMap;

use async_trait::async_trait;

use crate::actions::AppCatalog;
use crate::{Error, Result};

/// App catalog backed by the configured name-to-command table
///
/// The table is loaded once at startup from configuration; spoken
/// names are matched case-insensitively against its keys.
#[derive(Debug)]
pub struct SystemAppCatalog {
    table: HashMap<String, String>,
}

impl SystemAppCatalog {
    /// Build the catalog from configured name/command pairs
    #[must_use]
    pub fn new(apps: &HashMap<String, String>) -> Self {
        let table = apps
            .iter()
            .map(|(name, command)| (name.to_lowercase(), command.clone()))
            .collect();
        Self { table }
    }
}

#[async_trait]
impl AppCatalog for SystemAppCatalog {
    fn lookup(&self, name: &str) -> Option<String> {
        self.table.get(&name.trim().to_lowercase()).cloned()
    }

    async fn launch(&self, command: &str) -> Result<()> {
        let mut parts = command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| Error::App("empty launch command".to_string()))?;

        let child = tokio::process::Command::new(program)
            .args(parts)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| Error::App(format!("failed to launch {program}: {e}")))?;

        tracing::info!(command, pid = child.id(), "application launched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> SystemAppCatalog {
        let mut apps = HashMap::new();
        apps.insert("Notepad".to_string(), "gedit".to_string());
        apps.insert("browser".to_string(), "firefox --new-window".to_string());
        SystemAppCatalog::new(&apps)
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let c = catalog();
        assert_eq!(c.lookup("NOTEPAD"), Some("gedit".to_string()));
        assert_eq!(c.lookup("notepad"), Some("gedit".to_string()));
    }

    #[test]
    fn lookup_trims_whitespace() {
        let c = catalog();
        assert_eq!(c.lookup("  BROWSER "), Some("firefox --new-window".to_string()));
    }

    #[test]
    fn unknown_app_is_none() {
        assert_eq!(catalog().lookup("SOLITAIRE"), None);
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let result = catalog().launch("   ").await;
        assert!(matches!(result, Err(Error::App(_))));
    }
}
