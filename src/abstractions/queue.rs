//! Hand-off to the downstream materializer

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{ErrorCode, Result, SubmitError};

/// Request to expand a coordinator job into actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializationRequest {
    pub job_id: String,
    /// Materialize actions whose nominal time falls before this instant
    pub horizon_end: DateTime<Utc>,
    pub lookahead_secs: u64,
    #[serde(with = "duration_millis")]
    pub delay: Duration,
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Queue consumed by the materializer
#[async_trait]
pub trait MaterializationQueue: Send + Sync {
    /// Schedule `request`; delivery happens after `request.delay`
    async fn enqueue(&self, request: MaterializationRequest) -> Result<()>;
}

/// Delivers requests over an `mpsc` channel after their delay elapses
#[derive(Debug, Clone)]
pub struct TokioMaterializationQueue {
    sender: mpsc::UnboundedSender<MaterializationRequest>,
}

impl TokioMaterializationQueue {
    /// Queue plus the receiving end the materializer reads from
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<MaterializationRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl MaterializationQueue for TokioMaterializationQueue {
    async fn enqueue(&self, request: MaterializationRequest) -> Result<()> {
        if self.sender.is_closed() {
            return Err(SubmitError::persistence(
                ErrorCode::PERSISTENCE_UNAVAILABLE,
                "materialization queue is closed",
            ));
        }

        let sender = self.sender.clone();
        debug!(job_id = %request.job_id, delay_ms = request.delay.as_millis() as u64, "scheduling materialization");
        tokio::spawn(async move {
            tokio::time::sleep(request.delay).await;
            let job_id = request.job_id.clone();
            if sender.send(request).is_err() {
                warn!(job_id = %job_id, "materializer went away before request delivery");
            }
        });
        Ok(())
    }
}
