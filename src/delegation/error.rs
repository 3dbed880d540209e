//! Delegation error types.

use uuid::Uuid;

use crate::ai::AiError;

use super::{EvidenceLog, Termination};

/// Errors raised while resolving a question.
#[derive(thiserror::Error, Debug)]
pub enum DelegationError {
    /// Empty question or context, or an unusable configuration.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The caller-supplied depth exceeds the configured maximum.
    #[error("Recursion depth {depth} exceeds maximum {max_depth}")]
    RecursionLimit { depth: usize, max_depth: usize },

    /// The model client failed. The cause is passed through unchanged.
    #[error(transparent)]
    ModelUnavailable(#[from] AiError),

    /// The boss emitted the completion sentinel without an answer.
    #[error("Malformed boss output: {raw:?}")]
    Parse { raw: String },
}

/// A failed resolution together with the evidence gathered before it failed.
#[derive(thiserror::Error, Debug)]
#[error("{error}")]
pub struct ResolutionFailure {
    pub resolution_id: Uuid,
    #[source]
    pub error: DelegationError,
    pub evidence: EvidenceLog,
}

impl ResolutionFailure {
    /// Always [`Termination::Error`].
    #[must_use]
    pub fn terminated_by(&self) -> Termination {
        Termination::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_unavailable_is_undecorated() {
        let err = DelegationError::from(AiError::RequestFailed("connection reset".to_string()));
        assert_eq!(err.to_string(), "API request failed: connection reset");
    }

    #[test]
    fn test_recursion_limit_display() {
        let err = DelegationError::RecursionLimit {
            depth: 2,
            max_depth: 1,
        };
        assert_eq!(err.to_string(), "Recursion depth 2 exceeds maximum 1");
    }

    #[test]
    fn test_parse_error_keeps_raw_output() {
        let err = DelegationError::Parse {
            raw: "FINAL_ANSWER:   ".to_string(),
        };
        assert!(err.to_string().contains("FINAL_ANSWER:"));
    }

    #[test]
    fn test_failure_reports_error_termination() {
        let mut evidence = EvidenceLog::new();
        evidence.push("q", "a");
        let failure = ResolutionFailure {
            resolution_id: Uuid::new_v4(),
            error: DelegationError::InvalidInput("context must not be empty".to_string()),
            evidence,
        };
        assert_eq!(failure.terminated_by(), Termination::Error);
        assert_eq!(failure.evidence.len(), 1);
        assert_eq!(
            failure.to_string(),
            "Invalid input: context must not be empty"
        );
    }
}
