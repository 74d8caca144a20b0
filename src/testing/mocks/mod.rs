//! Mock implementations for testing

pub mod loader;
pub mod notifier;
pub mod queue;
pub mod store;

pub use loader::MemoryDefinitionLoader;
pub use notifier::RecordingNotifier;
pub use queue::RecordingQueue;
pub use store::FailingJobStore;
