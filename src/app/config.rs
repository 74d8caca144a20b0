//! Application configuration
//!
//! Process-level settings for an embedding application: log verbosity and
//! the submission settings shared by every [`SubmissionService`].
//!
//! [`SubmissionService`]: crate::submit::SubmissionService

use anyhow::Result;
use std::path::Path;

use crate::config::SubmitSettings;

/// Application configuration structure
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Verbosity level for logging
    pub verbose: u8,
    /// Settings handed to submission services
    pub settings: SubmitSettings,
}

impl AppConfig {
    pub fn new(verbose: u8) -> Self {
        Self {
            verbose,
            settings: SubmitSettings::default(),
        }
    }

    /// Replace the submission settings with those from a TOML file
    pub async fn with_settings_file(mut self, path: &Path) -> Result<Self> {
        self.settings = SubmitSettings::load(path).await?;
        Ok(self)
    }

    pub fn with_settings(mut self, settings: SubmitSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Get the log filter string based on verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_by_verbosity() {
        assert_eq!(AppConfig::new(0).log_level(), "info");
        assert_eq!(AppConfig::new(1).log_level(), "debug");
        assert_eq!(AppConfig::new(5).log_level(), "trace");
    }

    #[tokio::test]
    async fn test_settings_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("submit.toml");
        std::fs::write(&path, "default_timeout_minutes = 15\n").unwrap();

        let config = AppConfig::new(0).with_settings_file(&path).await.unwrap();
        assert_eq!(config.settings.default_timeout_minutes, 15);
    }
}
