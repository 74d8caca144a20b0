//! In-memory job store

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::job::{BundleJob, CoordinatorJob};
use crate::storage::{
    error::{StorageError, StorageResult},
    traits::JobStore,
    types::HealthStatus,
};

/// Job store kept in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryJobStore {
    coordinators: Arc<RwLock<HashMap<String, CoordinatorJob>>>,
    bundles: Arc<RwLock<HashMap<String, BundleJob>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn coordinator_count(&self) -> usize {
        self.coordinators.read().await.len()
    }

    pub async fn bundle_count(&self) -> usize {
        self.bundles.read().await.len()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert_coordinator(&self, job: &CoordinatorJob) -> StorageResult<()> {
        let mut coordinators = self.coordinators.write().await;
        if coordinators.contains_key(&job.id) {
            return Err(StorageError::conflict(format!("coordinator job {}", job.id)));
        }
        coordinators.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn insert_bundle(&self, job: &BundleJob) -> StorageResult<()> {
        let mut bundles = self.bundles.write().await;
        if bundles.contains_key(&job.id) {
            return Err(StorageError::conflict(format!("bundle job {}", job.id)));
        }
        bundles.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn get_coordinator(&self, id: &str) -> StorageResult<Option<CoordinatorJob>> {
        Ok(self.coordinators.read().await.get(id).cloned())
    }

    async fn get_bundle(&self, id: &str) -> StorageResult<Option<BundleJob>> {
        Ok(self.bundles.read().await.get(id).cloned())
    }

    async fn coordinators_for_bundle(&self, bundle_id: &str) -> StorageResult<Vec<CoordinatorJob>> {
        let mut jobs: Vec<CoordinatorJob> = self
            .coordinators
            .read()
            .await
            .values()
            .filter(|job| job.bundle_id.as_deref() == Some(bundle_id))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| a.created_time.cmp(&b.created_time).then(a.id.cmp(&b.id)));
        Ok(jobs)
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        Ok(HealthStatus::healthy("memory"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job(id: &str, bundle: Option<&str>) -> CoordinatorJob {
        let mut job = CoordinatorJob::draft("/apps/c.xml", "alice", Utc::now());
        job.id = id.to_string();
        job.bundle_id = bundle.map(str::to_string);
        job
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryJobStore::new();
        store.insert_coordinator(&job("1-C", None)).await.unwrap();
        assert!(store.get_coordinator("1-C").await.unwrap().is_some());
        assert!(store.get_coordinator("2-C").await.unwrap().is_none());
        assert_eq!(store.coordinator_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let store = InMemoryJobStore::new();
        store.insert_coordinator(&job("1-C", None)).await.unwrap();
        let err = store.insert_coordinator(&job("1-C", None)).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_children_of_bundle() {
        let store = InMemoryJobStore::new();
        store.insert_coordinator(&job("1-C", Some("9-B"))).await.unwrap();
        store.insert_coordinator(&job("2-C", None)).await.unwrap();
        store.insert_coordinator(&job("3-C", Some("9-B"))).await.unwrap();

        let children = store.coordinators_for_bundle("9-B").await.unwrap();
        let ids: Vec<&str> = children.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"1-C") && ids.contains(&"3-C"));
        assert!(store.health_check().await.unwrap().healthy);
    }
}
