//! Job store with injectable failures

use async_trait::async_trait;

use crate::job::{BundleJob, CoordinatorJob};
use crate::storage::{HealthStatus, InMemoryJobStore, JobStore, StorageError, StorageResult};

/// Delegates to an [`InMemoryJobStore`] unless told to fail
#[derive(Debug, Clone, Default)]
pub struct FailingJobStore {
    inner: InMemoryJobStore,
    unhealthy: bool,
    fail_inserts: bool,
}

impl FailingJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Health checks report the backend as down
    pub fn unhealthy(mut self) -> Self {
        self.unhealthy = true;
        self
    }

    /// Inserts fail with `Unavailable`
    pub fn failing_inserts(mut self) -> Self {
        self.fail_inserts = true;
        self
    }

    pub fn inner(&self) -> &InMemoryJobStore {
        &self.inner
    }
}

#[async_trait]
impl JobStore for FailingJobStore {
    async fn insert_coordinator(&self, job: &CoordinatorJob) -> StorageResult<()> {
        if self.fail_inserts {
            return Err(StorageError::unavailable("insert rejected"));
        }
        self.inner.insert_coordinator(job).await
    }

    async fn insert_bundle(&self, job: &BundleJob) -> StorageResult<()> {
        if self.fail_inserts {
            return Err(StorageError::unavailable("insert rejected"));
        }
        self.inner.insert_bundle(job).await
    }

    async fn get_coordinator(&self, id: &str) -> StorageResult<Option<CoordinatorJob>> {
        self.inner.get_coordinator(id).await
    }

    async fn get_bundle(&self, id: &str) -> StorageResult<Option<BundleJob>> {
        self.inner.get_bundle(id).await
    }

    async fn coordinators_for_bundle(&self, bundle_id: &str) -> StorageResult<Vec<CoordinatorJob>> {
        self.inner.coordinators_for_bundle(bundle_id).await
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        if self.unhealthy {
            return Ok(HealthStatus::unhealthy("failing", "backend marked down"));
        }
        self.inner.health_check().await
    }
}
