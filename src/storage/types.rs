//! Type definitions for the job store

use serde::{Deserialize, Serialize};

/// Outcome of a store health probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub backend_type: String,
    pub message: Option<String>,
}

impl HealthStatus {
    pub fn healthy(backend_type: &str) -> Self {
        Self {
            healthy: true,
            backend_type: backend_type.to_string(),
            message: None,
        }
    }

    pub fn unhealthy(backend_type: &str, message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            backend_type: backend_type.to_string(),
            message: Some(message.into()),
        }
    }
}
