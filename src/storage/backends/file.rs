//! File-backed job store: one JSON document per job

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::job::{BundleJob, CoordinatorJob};
use crate::storage::{
    error::{StorageError, StorageResult},
    traits::JobStore,
    types::HealthStatus,
};

const COORDINATORS: &str = "coordinators";
const BUNDLES: &str = "bundles";

/// Stores jobs under `<base>/coordinators/<id>.json` and `<base>/bundles/<id>.json`
#[derive(Debug, Clone)]
pub struct FileJobStore {
    base_dir: PathBuf,
}

impl FileJobStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn get_path(&self, domain: &str, id: &str) -> StorageResult<PathBuf> {
        if id.is_empty() || id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(StorageError::not_found(format!("invalid job id '{}'", id)));
        }
        Ok(self.base_dir.join(domain).join(format!("{}.json", id)))
    }

    /// Write a new document, failing if one already exists
    async fn create_json<T: Serialize>(&self, path: &Path, data: &T) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_vec_pretty(data)?;
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StorageError::conflict(path.display()))
            }
            Err(e) => return Err(StorageError::Io(e)),
        };
        file.write_all(&content).await?;
        file.flush().await?;
        Ok(())
    }

    async fn read_json<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> StorageResult<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn insert_coordinator(&self, job: &CoordinatorJob) -> StorageResult<()> {
        let path = self.get_path(COORDINATORS, &job.id)?;
        self.create_json(&path, job).await
    }

    async fn insert_bundle(&self, job: &BundleJob) -> StorageResult<()> {
        let path = self.get_path(BUNDLES, &job.id)?;
        self.create_json(&path, job).await
    }

    async fn get_coordinator(&self, id: &str) -> StorageResult<Option<CoordinatorJob>> {
        let path = self.get_path(COORDINATORS, id)?;
        self.read_json(&path).await
    }

    async fn get_bundle(&self, id: &str) -> StorageResult<Option<BundleJob>> {
        let path = self.get_path(BUNDLES, id)?;
        self.read_json(&path).await
    }

    async fn coordinators_for_bundle(&self, bundle_id: &str) -> StorageResult<Vec<CoordinatorJob>> {
        let dir = self.base_dir.join(COORDINATORS);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::Io(e)),
        };

        let mut jobs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(job) = self.read_json::<CoordinatorJob>(&path).await? {
                    if job.bundle_id.as_deref() == Some(bundle_id) {
                        jobs.push(job);
                    }
                }
            }
        }
        jobs.sort_by(|a, b| a.created_time.cmp(&b.created_time).then(a.id.cmp(&b.id)));
        Ok(jobs)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        if let Err(e) = fs::create_dir_all(&self.base_dir).await {
            return Ok(HealthStatus::unhealthy("file", e.to_string()));
        }
        let probe = self.base_dir.join(".health_check");
        let result = fs::write(&probe, "health_check").await;
        let _ = fs::remove_file(&probe).await;

        Ok(match result {
            Ok(()) => HealthStatus::healthy("file"),
            Err(e) => HealthStatus::unhealthy("file", e.to_string()),
        })
    }
}
