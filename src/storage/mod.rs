//! Job persistence
//!
//! The submission pipeline hands finished records to a [`JobStore`]. Two
//! backends ship with the crate: [`InMemoryJobStore`] for embedding and
//! tests, and [`FileJobStore`] which keeps one JSON document per job.

pub mod backends;
pub mod error;
pub mod traits;
pub mod types;

pub use backends::{FileJobStore, InMemoryJobStore};
pub use error::{StorageError, StorageResult};
pub use traits::JobStore;
pub use types::HealthStatus;
