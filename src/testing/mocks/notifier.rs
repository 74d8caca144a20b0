//! Mock bundle status notifier

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::abstractions::{BundleStatusNotifier, BundleStatusUpdate};
use crate::error::{Result, SubmitError};

/// Keeps every update it receives
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    updates: Arc<Mutex<Vec<BundleStatusUpdate>>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records updates, then reports a failure for each
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn updates(&self) -> Vec<BundleStatusUpdate> {
        self.updates.lock().await.clone()
    }
}

#[async_trait]
impl BundleStatusNotifier for RecordingNotifier {
    async fn notify(&self, update: BundleStatusUpdate) -> Result<()> {
        self.updates.lock().await.push(update);
        if self.fail {
            return Err(SubmitError::precondition("bundle is not reachable"));
        }
        Ok(())
    }
}
