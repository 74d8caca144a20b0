//! Job identifier generation

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::job::JobKind;

/// Allocates globally unique job identifiers
pub trait IdGenerator: Send + Sync {
    fn generate(&self, kind: JobKind) -> String;
}

/// Random identifiers: `<uuid>-C` / `<uuid>-B`
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self, kind: JobKind) -> String {
        format!("{}-{}", Uuid::new_v4(), kind.id_suffix())
    }
}

/// Sequential identifiers scoped to one process start:
/// `0000001-<yyMMddHHmmssSSS>-<system>-C`
#[derive(Debug)]
pub struct SequenceIdGenerator {
    counter: AtomicU64,
    started: String,
    system_id: String,
}

impl SequenceIdGenerator {
    pub fn new(system_id: impl Into<String>) -> Self {
        Self {
            counter: AtomicU64::new(0),
            started: Utc::now().format("%y%m%d%H%M%S%3f").to_string(),
            system_id: system_id.into(),
        }
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn generate(&self, kind: JobKind) -> String {
        let sequence = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!(
            "{:07}-{}-{}-{}",
            sequence,
            self.started,
            self.system_id,
            kind.id_suffix()
        )
    }
}
