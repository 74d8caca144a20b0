//! Mock definition loader

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

use crate::abstractions::DefinitionLoader;
use crate::error::{ErrorCode, Result, SubmitError};

/// Serves documents from a map keyed by the exact URI
#[derive(Debug, Clone, Default)]
pub struct MemoryDefinitionLoader {
    documents: HashMap<String, String>,
    read_errors: HashSet<String>,
}

impl MemoryDefinitionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, uri: impl Into<String>, content: impl Into<String>) -> Self {
        self.documents.insert(uri.into(), content.into());
        self
    }

    /// Make `uri` exist but fail on read
    pub fn with_read_error(mut self, uri: impl Into<String>) -> Self {
        self.read_errors.insert(uri.into());
        self
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl DefinitionLoader for MemoryDefinitionLoader {
    async fn read(&self, uri: &str) -> Result<String> {
        if self.read_errors.contains(uri) {
            return Err(SubmitError::definition_read(
                ErrorCode::DEFINITION_READ_FAILED,
                "simulated read failure",
                uri,
            ));
        }
        self.documents.get(uri).cloned().ok_or_else(|| {
            SubmitError::definition_read(ErrorCode::DEFINITION_READ_FAILED, "no such document", uri)
        })
    }

    async fn exists(&self, uri: &str) -> Result<bool> {
        Ok(self.documents.contains_key(uri) || self.read_errors.contains(uri))
    }
}
