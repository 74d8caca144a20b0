//! Mock materialization queue

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::abstractions::{MaterializationQueue, MaterializationRequest};
use crate::error::{ErrorCode, Result, SubmitError};

/// Records requests instead of scheduling them
#[derive(Debug, Clone, Default)]
pub struct RecordingQueue {
    requests: Arc<Mutex<Vec<MaterializationRequest>>>,
    fail: bool,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue whose every enqueue fails
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn requests(&self) -> Vec<MaterializationRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl MaterializationQueue for RecordingQueue {
    async fn enqueue(&self, request: MaterializationRequest) -> Result<()> {
        if self.fail {
            return Err(SubmitError::persistence(
                ErrorCode::PERSISTENCE_UNAVAILABLE,
                "queue rejected request",
            ));
        }
        self.requests.lock().await.push(request);
        Ok(())
    }
}
