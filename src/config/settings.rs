//! Service-level submission settings loaded from TOML

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_timeout_minutes() -> i64 {
    120
}

fn default_lookahead_secs() -> u64 {
    3600
}

fn default_delay_ms() -> u64 {
    100
}

fn default_dry_run_window_secs() -> u64 {
    3600
}

fn default_max_include_depth() -> usize {
    32
}

fn default_system_id() -> String {
    "coord-submit".to_string()
}

/// Tunables shared by every submission handled by one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitSettings {
    /// Coordinator timeout used when `controls/timeout` is absent
    #[serde(default = "default_timeout_minutes")]
    pub default_timeout_minutes: i64,
    /// How far ahead the first materialization request looks
    #[serde(default = "default_lookahead_secs")]
    pub materialization_lookahead_secs: u64,
    /// Delay before the first materialization request runs
    #[serde(default = "default_delay_ms")]
    pub materialization_delay_ms: u64,
    #[serde(default = "default_dry_run_window_secs")]
    pub dry_run_window_secs: u64,
    /// Nesting limit for dataset `include` chains
    #[serde(default = "default_max_include_depth")]
    pub max_include_depth: usize,
    #[serde(default = "default_system_id")]
    pub system_id: String,
}

impl Default for SubmitSettings {
    fn default() -> Self {
        Self {
            default_timeout_minutes: default_timeout_minutes(),
            materialization_lookahead_secs: default_lookahead_secs(),
            materialization_delay_ms: default_delay_ms(),
            dry_run_window_secs: default_dry_run_window_secs(),
            max_include_depth: default_max_include_depth(),
            system_id: default_system_id(),
        }
    }
}

impl SubmitSettings {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse submit settings")
    }

    /// Load settings from a TOML file on disk
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    pub fn materialization_lookahead(&self) -> Duration {
        Duration::from_secs(self.materialization_lookahead_secs)
    }

    pub fn materialization_delay(&self) -> Duration {
        Duration::from_millis(self.materialization_delay_ms)
    }

    pub fn dry_run_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.dry_run_window_secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let settings = SubmitSettings::from_toml_str("").unwrap();
        assert_eq!(settings, SubmitSettings::default());
        assert_eq!(settings.default_timeout_minutes, 120);
        assert_eq!(settings.materialization_delay(), Duration::from_millis(100));
        assert_eq!(settings.dry_run_window(), chrono::Duration::hours(1));
    }

    #[test]
    fn test_partial_override() {
        let settings = SubmitSettings::from_toml_str(
            "default_timeout_minutes = 30\nsystem_id = \"oozie-test\"\n",
        )
        .unwrap();
        assert_eq!(settings.default_timeout_minutes, 30);
        assert_eq!(settings.system_id, "oozie-test");
        assert_eq!(settings.max_include_depth, 32);
        assert!(SubmitSettings::from_toml_str("max_include_depth = \"deep\"").is_err());
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "materialization_lookahead_secs = 600").unwrap();
        let settings = SubmitSettings::load(file.path()).await.unwrap();
        assert_eq!(settings.materialization_lookahead(), Duration::from_secs(600));

        assert!(SubmitSettings::load(Path::new("/nonexistent/settings.toml"))
            .await
            .is_err());
    }
}
