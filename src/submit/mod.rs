//! Coordinator and bundle submission
//!
//! [`SubmissionService`] sequences loading, validation, configuration
//! merging, resolution, record assembly and persistence, and offers a dry
//! run that stops short of persistence.

pub mod builder;
pub mod phase;
pub mod service;

pub use builder::SubmissionServiceBuilder;
pub use phase::{SubmissionError, SubmissionPhase, SubmissionResult};
pub use service::{definition_uri, DryRunPreview, SubmissionService};
