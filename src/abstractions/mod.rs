//! Abstraction layers for external collaborators
//!
//! Reading definitions, schema validation, identifier allocation, the
//! materialization queue and parent-bundle notification are all reached
//! through traits so the submission pipeline can be tested without a file
//! system, a scheduler or a running bundle.

pub mod ids;
pub mod loader;
pub mod notify;
pub mod queue;
pub mod schema;

pub use ids::{IdGenerator, SequenceIdGenerator, UuidIdGenerator};
pub use loader::{DefinitionLoader, FsDefinitionLoader};
pub use notify::{BundleStatusNotifier, BundleStatusUpdate, LoggingBundleNotifier};
pub use queue::{MaterializationQueue, MaterializationRequest, TokioMaterializationQueue};
pub use schema::{SchemaName, SchemaValidator, StructuralSchemaValidator};
