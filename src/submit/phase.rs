//! Submission phases and the phase-tagged submission error

use std::fmt;
use thiserror::Error;
use tracing::warn;

use crate::error::{ErrorCode, Result, SubmitError};

/// Steps of one submission, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionPhase {
    Precondition,
    Loading,
    Validating,
    MergingConfig,
    Resolving,
    Assembling,
    Persisting,
}

impl SubmissionPhase {
    /// Stable code reported for any failure in this phase
    pub fn code(&self) -> u16 {
        match self {
            SubmissionPhase::Precondition => ErrorCode::SUBMIT_PRECONDITION,
            SubmissionPhase::Loading => ErrorCode::SUBMIT_LOADING,
            SubmissionPhase::Validating => ErrorCode::SUBMIT_VALIDATING,
            SubmissionPhase::MergingConfig => ErrorCode::SUBMIT_MERGING_CONFIG,
            SubmissionPhase::Resolving => ErrorCode::SUBMIT_RESOLVING,
            SubmissionPhase::Assembling => ErrorCode::SUBMIT_ASSEMBLING,
            SubmissionPhase::Persisting => ErrorCode::SUBMIT_PERSISTING,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionPhase::Precondition => "PRECONDITION",
            SubmissionPhase::Loading => "LOADING",
            SubmissionPhase::Validating => "VALIDATING",
            SubmissionPhase::MergingConfig => "MERGING_CONFIG",
            SubmissionPhase::Resolving => "RESOLVING",
            SubmissionPhase::Assembling => "ASSEMBLING",
            SubmissionPhase::Persisting => "PERSISTING",
        }
    }
}

impl fmt::Display for SubmissionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed submission: the phase it stopped in and the typed cause
#[derive(Error, Debug)]
#[error("[E{code:04}] Submission failed in {phase}: {cause}")]
pub struct SubmissionError {
    pub phase: SubmissionPhase,
    pub code: u16,
    #[source]
    pub cause: SubmitError,
}

impl SubmissionError {
    pub fn new(phase: SubmissionPhase, cause: SubmitError) -> Self {
        Self {
            phase,
            code: phase.code(),
            cause,
        }
    }

    /// Category of the underlying cause
    pub fn category(&self) -> &'static str {
        self.cause.category()
    }

    pub fn cause_code(&self) -> u16 {
        self.cause.code()
    }

    pub fn user_message(&self) -> String {
        format!("{} ({})", self.cause.user_message(), self.phase)
    }
}

pub type SubmissionResult<T> = std::result::Result<T, SubmissionError>;

/// Tags a phase-local result with its phase
pub(crate) trait PhaseResultExt<T> {
    fn in_phase(self, phase: SubmissionPhase) -> SubmissionResult<T>;
}

impl<T> PhaseResultExt<T> for Result<T> {
    fn in_phase(self, phase: SubmissionPhase) -> SubmissionResult<T> {
        self.map_err(|cause| {
            warn!(
                phase = %phase,
                code = cause.code(),
                category = cause.category(),
                "{}",
                cause
            );
            SubmissionError::new(phase, cause)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_phase_codes_are_distinct() {
        let phases = [
            SubmissionPhase::Precondition,
            SubmissionPhase::Loading,
            SubmissionPhase::Validating,
            SubmissionPhase::MergingConfig,
            SubmissionPhase::Resolving,
            SubmissionPhase::Assembling,
            SubmissionPhase::Persisting,
        ];
        let codes: std::collections::HashSet<u16> = phases.iter().map(|p| p.code()).collect();
        assert_eq!(codes.len(), phases.len());
    }

    #[test]
    fn test_in_phase_keeps_cause() {
        let result: Result<()> = Err(SubmitError::disallowed_property("YEAR"));
        let err = result.in_phase(SubmissionPhase::MergingConfig).unwrap_err();

        assert_eq!(err.code, ErrorCode::SUBMIT_MERGING_CONFIG);
        assert_eq!(err.cause_code(), ErrorCode::CONFIG_DISALLOWED_PROPERTY);
        assert_eq!(err.category(), "config");
        assert!(err.to_string().contains("MERGING_CONFIG"));
        assert!(err.to_string().contains("YEAR"));
        assert!(err.source().is_some());
    }
}
