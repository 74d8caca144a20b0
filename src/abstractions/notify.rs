//! Parent bundle notification

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::job::JobStatus;

/// Status change of a coordinator submitted on behalf of a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleStatusUpdate {
    pub bundle_id: String,
    /// Absent when the child failed before an id was allocated
    pub coord_job_id: Option<String>,
    pub coord_name: String,
    pub previous_status: JobStatus,
    pub status: JobStatus,
}

/// Receives child coordinator status changes for a bundle
#[async_trait]
pub trait BundleStatusNotifier: Send + Sync {
    async fn notify(&self, update: BundleStatusUpdate) -> Result<()>;
}

/// Notifier that only records updates in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingBundleNotifier;

#[async_trait]
impl BundleStatusNotifier for LoggingBundleNotifier {
    async fn notify(&self, update: BundleStatusUpdate) -> Result<()> {
        info!(
            bundle_id = %update.bundle_id,
            coord_job_id = ?update.coord_job_id,
            coord_name = %update.coord_name,
            "bundle child status {:?} -> {:?}",
            update.previous_status,
            update.status
        );
        Ok(())
    }
}
