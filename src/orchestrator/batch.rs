//! Atomic batch execution
//!
//! Chunks exist only because of a per-transaction cardinality limit, so the
//! operator still has to see all-or-nothing semantics. The constituent
//! intents are composed by the ledger client into one composite intent that is
//! driven with exactly the same lifecycle, cleanup and single-flight rules as a
//! single intent. A rejection is reported once for the whole batch.

use crate::ledger::LedgerClient;
use crate::metrics::metrics;
use crate::orchestrator::errors::OrchestrationError;
use crate::orchestrator::executor::{ExecutionHooks, ExecutionReport, TransactionExecutor};
use nonempty::NonEmpty;
use std::sync::Arc;

pub struct BatchTransactionExecutor<L: LedgerClient> {
    ledger: Arc<L>,
    executor: TransactionExecutor,
}

impl<L: LedgerClient> Clone for BatchTransactionExecutor<L> {
    fn clone(&self) -> Self {
        Self {
            ledger: Arc::clone(&self.ledger),
            executor: self.executor.clone(),
        }
    }
}

impl<L: LedgerClient> BatchTransactionExecutor<L> {
    /// `executor` supplies the guard, sinks and refresh hook
    pub fn new(ledger: Arc<L>, executor: TransactionExecutor) -> Self {
        Self { ledger, executor }
    }

    pub fn executor(&self) -> &TransactionExecutor {
        &self.executor
    }

    /// Compose `intents` into one atomic intent and drive it
    ///
    /// Composition happens only after the single-flight token is held; a
    /// composition error is a `SubmissionRejected` for the whole batch.
    pub async fn execute(
        &self,
        intents: NonEmpty<L::Intent>,
        hooks: ExecutionHooks,
    ) -> ExecutionReport {
        let constituents = into_vec(intents);
        let ledger = Arc::clone(&self.ledger);
        self.executor
            .drive(
                "execute_batch",
                move || async move {
                    metrics().batch_size.observe(constituents.len() as f64);
                    ledger.compose_batch(constituents).await
                },
                hooks,
            )
            .await
    }

    /// [`execute`](Self::execute) for a plain list; empty input is reported
    /// as `EmptyInput` without touching the token
    pub async fn execute_all(
        &self,
        intents: Vec<L::Intent>,
        hooks: ExecutionHooks,
    ) -> ExecutionReport {
        match NonEmpty::from_vec(intents) {
            Some(intents) => self.execute(intents, hooks).await,
            None => self
                .executor
                .reject("execute_batch", OrchestrationError::EmptyInput),
        }
    }
}

/// Flatten a non-empty list back into a `Vec`, keeping order
pub(crate) fn into_vec<T>(items: NonEmpty<T>) -> Vec<T> {
    let NonEmpty { head, tail } = items;
    let mut all = Vec::with_capacity(1 + tail.len());
    all.push(head);
    all.extend(tail);
    all
}
