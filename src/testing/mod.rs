//! Testing utilities and fixtures
//!
//! In-memory stand-ins for every collaborator of the submission pipeline,
//! plus a [`TestContext`] that lays definitions out in a temporary directory
//! for the file-system loader.

pub mod fixtures;
pub mod mocks;

pub use mocks::{FailingJobStore, MemoryDefinitionLoader, RecordingNotifier, RecordingQueue};

use anyhow::Result;
use std::path::PathBuf;
use tempfile::TempDir;

use crate::abstractions::FsDefinitionLoader;

/// Temporary definition root and a loader reading from it
pub struct TestContext {
    pub temp_dir: TempDir,
    pub loader: FsDefinitionLoader,
}

impl TestContext {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let loader = FsDefinitionLoader::new(temp_dir.path());
        Ok(Self { temp_dir, loader })
    }

    pub fn temp_path(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    /// Write `content` at `relative`, creating parent directories
    pub fn write_definition(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.temp_dir.path().join(relative.trim_start_matches('/'));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstractions::DefinitionLoader;

    #[tokio::test]
    async fn test_context_round_trip() {
        let context = TestContext::new().unwrap();
        context
            .write_definition("apps/coord/coordinator.xml", fixtures::HOURLY_COORDINATOR)
            .unwrap();

        let text = context
            .loader
            .read("hdfs://nn/apps/coord/coordinator.xml")
            .await
            .unwrap();
        assert_eq!(text, fixtures::HOURLY_COORDINATOR);
        assert!(!context.loader.exists("/apps/coord/missing.xml").await.unwrap());
    }
}
