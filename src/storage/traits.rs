//! Core trait definitions for job persistence

use async_trait::async_trait;

use super::error::StorageResult;
use super::types::HealthStatus;
use crate::job::{BundleJob, CoordinatorJob};

/// Persistence gateway for submitted jobs.
///
/// Inserts are atomic: a record is either fully stored or not at all, and a
/// second insert with an existing id fails with a conflict.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Store a new coordinator job
    async fn insert_coordinator(&self, job: &CoordinatorJob) -> StorageResult<()>;

    /// Store a new bundle job
    async fn insert_bundle(&self, job: &BundleJob) -> StorageResult<()>;

    async fn get_coordinator(&self, id: &str) -> StorageResult<Option<CoordinatorJob>>;

    async fn get_bundle(&self, id: &str) -> StorageResult<Option<BundleJob>>;

    /// Coordinators created on behalf of a bundle
    async fn coordinators_for_bundle(&self, bundle_id: &str) -> StorageResult<Vec<CoordinatorJob>>;

    /// Check the health of the storage backend
    async fn health_check(&self) -> StorageResult<HealthStatus>;
}
