//! Submission service construction

use std::sync::Arc;

use super::service::SubmissionService;
use crate::abstractions::{
    BundleStatusNotifier, DefinitionLoader, IdGenerator, LoggingBundleNotifier,
    MaterializationQueue, SchemaValidator, StructuralSchemaValidator, UuidIdGenerator,
};
use crate::config::{ConfigMerger, SubmitSettings};
use crate::storage::JobStore;

/// Builder for [`SubmissionService`].
///
/// Only the definition loader is required. Without a store the service can
/// only dry-run; without a queue accepted coordinators are not scheduled.
pub struct SubmissionServiceBuilder {
    loader: Arc<dyn DefinitionLoader>,
    validator: Arc<dyn SchemaValidator>,
    ids: Arc<dyn IdGenerator>,
    store: Option<Arc<dyn JobStore>>,
    queue: Option<Arc<dyn MaterializationQueue>>,
    notifier: Arc<dyn BundleStatusNotifier>,
    merger: ConfigMerger,
    settings: SubmitSettings,
}

impl SubmissionServiceBuilder {
    pub fn new(loader: Arc<dyn DefinitionLoader>) -> Self {
        Self {
            loader,
            validator: Arc::new(StructuralSchemaValidator),
            ids: Arc::new(UuidIdGenerator),
            store: None,
            queue: None,
            notifier: Arc::new(LoggingBundleNotifier),
            merger: ConfigMerger::default(),
            settings: SubmitSettings::default(),
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn SchemaValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn JobStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_queue(mut self, queue: Arc<dyn MaterializationQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn BundleStatusNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Replace the reserved-property rules
    pub fn with_merger(mut self, merger: ConfigMerger) -> Self {
        self.merger = merger;
        self
    }

    pub fn with_settings(mut self, settings: SubmitSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> SubmissionService {
        SubmissionService {
            loader: self.loader,
            validator: self.validator,
            ids: self.ids,
            store: self.store,
            queue: self.queue,
            notifier: self.notifier,
            merger: self.merger,
            settings: self.settings,
        }
    }
}

impl SubmissionService {
    pub fn builder(loader: Arc<dyn DefinitionLoader>) -> SubmissionServiceBuilder {
        SubmissionServiceBuilder::new(loader)
    }
}
