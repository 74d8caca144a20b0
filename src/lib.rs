//! # coord-submit
//!
//! Resolution and submission of time-driven coordinator and bundle job
//! definitions: templated XML is loaded, validated, merged with default
//! configuration, resolved expression by expression, assembled into a job
//! record and handed to a job store and the downstream materializer.
//!
//! ## Modules
//!
//! - `abstractions` - Traits for external collaborators (loader, schema, ids, queue, notifier)
//! - `app` - Application config and logging setup
//! - `bundle` - Bundle definition resolution
//! - `config` - Job configuration, default-config merging and service settings
//! - `coord` - Coordinator resolution: datasets, events, assembly and dry-run preview
//! - `el` - The expression language and its phase-scoped evaluators
//! - `error` - Error taxonomy and codes
//! - `job` - Job records and their projection from resolved definitions
//! - `storage` - Job persistence backends
//! - `submit` - The phase-sequenced submission service
//! - `testing` - Mocks and fixtures for tests
//! - `time` - UTC timestamps, time units and timezone checks
//! - `xml` - Owned XML tree used during resolution
pub mod abstractions;
pub mod app;
pub mod bundle;
pub mod config;
pub mod coord;
pub mod el;
pub mod error;
pub mod job;
pub mod storage;
pub mod submit;
pub mod time;
pub mod xml;

pub mod testing;

pub use config::JobConf;
pub use error::{ErrorCode, Result, SubmitError};
pub use submit::{DryRunPreview, SubmissionError, SubmissionService};
