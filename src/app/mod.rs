//! Application module
//!
//! Helpers for embedding the submission service in a process:
//! configuration loading and logging setup.

pub mod config;
pub mod logging;

pub use config::AppConfig;
pub use logging::{init_logging, init_tracing};
