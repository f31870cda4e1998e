//! Transaction lifecycle state machine
//!
//! ```text
//! Unknown --run()--> [accepted] --> Running --> Succeeded   (terminal)
//!    |                                 |
//!    +--rejected--> Failed (terminal)  +--later rejection--> Failed (terminal)
//! ```
//!
//! States are monotonic: once `Succeeded` or `Failed` is observed nothing
//! else is accepted for that intent.

use crate::orchestrator::errors::OrchestrationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// State reported by an intent at each transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionState {
    Unknown,
    Running,
    Succeeded,
    Failed,
}

impl TransactionState {
    /// `Succeeded` and `Failed` end the lifecycle
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Whether `self -> next` is an edge of the lifecycle graph
    pub fn can_transition_to(self, next: TransactionState) -> bool {
        matches!(
            (self, next),
            (Self::Unknown, Self::Running)
                | (Self::Unknown, Self::Failed)
                | (Self::Running, Self::Succeeded)
                | (Self::Running, Self::Failed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lifecycle transition as emitted by the ledger client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub previous: TransactionState,
    pub new: TransactionState,
    /// Intent-specific diagnostic payload (hash, error text, ...)
    pub diagnostic: String,
}

impl StatusChange {
    pub fn new(
        previous: TransactionState,
        new: TransactionState,
        diagnostic: impl Into<String>,
    ) -> Self {
        Self {
            previous,
            new,
            diagnostic: diagnostic.into(),
        }
    }
}

/// What applying a status change meant for the executor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Entered `Running`
    Running,
    /// Entered `Succeeded`
    Succeeded,
    /// Entered `Failed`; `after_running` marks a late failure
    Failed {
        after_running: bool,
        diagnostic: String,
    },
    /// Same state reported again
    Unchanged,
}

/// Executor-side view of one intent's lifecycle
#[derive(Debug, Clone)]
pub struct LifecycleTracker {
    current: TransactionState,
    history: Vec<StatusChange>,
}

impl LifecycleTracker {
    pub fn new() -> Self {
        Self {
            current: TransactionState::Unknown,
            history: Vec::with_capacity(2),
        }
    }

    /// Last state accepted by the tracker
    pub fn current(&self) -> TransactionState {
        self.current
    }

    /// Every change accepted so far, in arrival order
    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    pub fn into_history(self) -> Vec<StatusChange> {
        self.history
    }

    /// Apply a status change
    ///
    /// The tracker trusts its own current state over the `previous` field of
    /// the event. Changes out of a terminal state and edges missing from the
    /// lifecycle graph are rejected with `InvalidTransition`.
    pub fn apply(&mut self, change: StatusChange) -> Result<Step, OrchestrationError> {
        let from = self.current;
        let to = change.new;

        if from.is_terminal() {
            return Err(OrchestrationError::InvalidTransition { from, to });
        }
        if from == to {
            return Ok(Step::Unchanged);
        }
        if !from.can_transition_to(to) {
            return Err(OrchestrationError::InvalidTransition { from, to });
        }

        if change.previous != from {
            tracing::debug!(
                reported_previous = %change.previous,
                tracked_previous = %from,
                new = %to,
                "Status change disagrees with tracked state"
            );
        }

        self.current = to;
        let step = match to {
            TransactionState::Running => Step::Running,
            TransactionState::Succeeded => Step::Succeeded,
            TransactionState::Failed => Step::Failed {
                after_running: from == TransactionState::Running,
                diagnostic: change.diagnostic.clone(),
            },
            // `Unknown` is never reachable from another state
            TransactionState::Unknown => Step::Unchanged,
        };
        self.history.push(change);
        Ok(step)
    }
}

impl Default for LifecycleTracker {
    fn default() -> Self {
        Self::new()
    }
}
