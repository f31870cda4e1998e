//! Error taxonomy for the orchestration layer
//!
//! Every error here is caught at the executor boundary and converted into a
//! notification-sink message; none of them is retried automatically.

use crate::ledger::LedgerError;
use crate::orchestrator::state::TransactionState;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OrchestrationError {
    /// A submission was attempted while the surface's single-flight token was
    /// held. Nothing was performed.
    #[error("Another transaction is already in flight on this surface")]
    Busy,

    /// The ledger rejected the intent before it started running
    ///
    /// Covers signing, validation and network rejections from `run`, failures
    /// while constructing the intent or composite batch, and an
    /// `Unknown -> Failed` transition.
    #[error("Submission rejected: {reason}")]
    SubmissionRejected { reason: String },

    /// A batch was requested for a zero-length input list
    #[error("Batch input is empty")]
    EmptyInput,

    /// The intent reached `Running` and then `Failed`
    #[error("Transaction failed after it started running: {reason}")]
    LateFailure { reason: String },

    #[error("Invalid chunk size {0}: must be positive")]
    InvalidChunkSize(usize),

    /// A caller hook panicked. The panic is contained and tracking continues.
    #[error("Hook `{hook}` panicked: {message}")]
    HookPanicked { hook: &'static str, message: String },

    /// The status stream closed before a terminal state was observed
    #[error("Status stream closed before a terminal state (last state: {last_state})")]
    Abandoned { last_state: TransactionState },

    /// The ledger client emitted a transition outside the lifecycle graph
    #[error("Invalid status transition {from} -> {to}")]
    InvalidTransition {
        from: TransactionState,
        to: TransactionState,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl OrchestrationError {
    /// Error category for metrics and observability
    pub fn category(&self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::SubmissionRejected { .. } => "submission_rejected",
            Self::EmptyInput => "empty_input",
            Self::LateFailure { .. } => "late_failure",
            Self::InvalidChunkSize(_) => "invalid_chunk_size",
            Self::HookPanicked { .. } => "hook_panicked",
            Self::Abandoned { .. } => "abandoned",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Configuration(_) => "config",
        }
    }

    /// True when the ledger may or may not have applied the operation
    pub fn ledger_outcome_unknown(&self) -> bool {
        matches!(self, Self::Abandoned { .. })
    }

    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::SubmissionRejected {
            reason: reason.into(),
        }
    }

    pub fn late_failure(reason: impl Into<String>) -> Self {
        Self::LateFailure {
            reason: reason.into(),
        }
    }
}

impl From<LedgerError> for OrchestrationError {
    fn from(err: LedgerError) -> Self {
        Self::rejected(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            OrchestrationError::Busy.to_string(),
            "Another transaction is already in flight on this surface"
        );
        assert_eq!(
            OrchestrationError::late_failure("reverted").to_string(),
            "Transaction failed after it started running: reverted"
        );
        assert_eq!(
            OrchestrationError::Abandoned {
                last_state: TransactionState::Running
            }
            .to_string(),
            "Status stream closed before a terminal state (last state: running)"
        );
    }

    #[test]
    fn test_ledger_error_becomes_submission_rejected() {
        let err: OrchestrationError = LedgerError::Signing("wallet locked".into()).into();
        assert_eq!(
            err,
            OrchestrationError::rejected("Signing failed: wallet locked")
        );
        assert_eq!(err.category(), "submission_rejected");
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(OrchestrationError::EmptyInput.category(), "empty_input");
        assert_eq!(OrchestrationError::InvalidChunkSize(0).category(), "invalid_chunk_size");
        assert_eq!(
            OrchestrationError::HookPanicked {
                hook: "on_running",
                message: "boom".into()
            }
            .category(),
            "hook_panicked"
        );
        assert!(OrchestrationError::Abandoned {
            last_state: TransactionState::Unknown
        }
        .ledger_outcome_unknown());
        assert!(!OrchestrationError::Busy.ledger_outcome_unknown());
    }
}
