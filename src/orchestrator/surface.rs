//! Control surface: one guard and its executors
//!
//! A hosting UI creates one `ControlSurface` per logical panel (for example
//! one asset's action panel) and drops it with the panel. Every executor the
//! surface hands out shares that surface's single-flight guard and nothing
//! else, so two surfaces can have transactions in flight at the same time.

use crate::config::OrchestratorConfig;
use crate::ledger::LedgerClient;
use crate::orchestrator::batch::{into_vec, BatchTransactionExecutor};
use crate::orchestrator::errors::OrchestrationError;
use crate::orchestrator::executor::{ExecutionHooks, ExecutionReport, TransactionExecutor};
use crate::orchestrator::guard::SingleFlightGuard;
use crate::orchestrator::planner::BatchPlanner;
use crate::orchestrator::sinks::{Notifier, StatusRelay};
use std::sync::Arc;
use tokio::sync::watch;

pub struct ControlSurface<L: LedgerClient> {
    guard: Arc<SingleFlightGuard>,
    ledger: Arc<L>,
    planner: BatchPlanner,
    executor: TransactionExecutor,
    batch: BatchTransactionExecutor<L>,
}

impl<L: LedgerClient> ControlSurface<L> {
    pub fn new(
        name: impl Into<String>,
        ledger: Arc<L>,
        config: &OrchestratorConfig,
        notifier: Arc<dyn Notifier>,
        relay: Arc<dyn StatusRelay>,
    ) -> Result<Self, OrchestrationError> {
        let planner = BatchPlanner::from_config(&config.batch)?;
        config
            .validate()
            .map_err(|e| OrchestrationError::Configuration(e.to_string()))?;
        let guard = Arc::new(SingleFlightGuard::new(name));
        let executor = TransactionExecutor::new(Arc::clone(&guard), notifier, relay);
        let batch = BatchTransactionExecutor::new(Arc::clone(&ledger), executor.clone());
        Ok(Self {
            guard,
            ledger,
            planner,
            executor,
            batch,
        })
    }

    /// Install the post-success refresh hook on every executor of the surface
    pub fn with_refresh_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.executor = self.executor.with_refresh_hook(hook);
        self.batch = BatchTransactionExecutor::new(Arc::clone(&self.ledger), self.executor.clone());
        self
    }

    pub fn name(&self) -> &str {
        self.guard.surface()
    }

    pub fn guard(&self) -> &Arc<SingleFlightGuard> {
        &self.guard
    }

    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    /// Busy indicator for UI controls
    pub fn busy_watch(&self) -> watch::Receiver<bool> {
        self.guard.busy_watch()
    }

    pub fn planner(&self) -> &BatchPlanner {
        &self.planner
    }

    pub fn executor(&self) -> &TransactionExecutor {
        &self.executor
    }

    pub fn batch_executor(&self) -> &BatchTransactionExecutor<L> {
        &self.batch
    }

    /// Build one intent from `operation` under the token and drive it
    pub async fn submit(&self, operation: L::Operation, hooks: ExecutionHooks) -> ExecutionReport {
        let ledger = Arc::clone(&self.ledger);
        self.executor
            .drive(
                "submit",
                move || async move { ledger.build_intent(operation).await },
                hooks,
            )
            .await
    }

    /// Plan, materialize and submit a bulk operation
    ///
    /// Input that fits in one chunk is submitted as a plain intent; larger
    /// input is composed into one atomic batch. Empty input is reported as
    /// `EmptyInput` before the token is touched and builds nothing.
    pub async fn submit_bulk<T, F>(
        &self,
        items: Vec<T>,
        mut to_operation: F,
        hooks: ExecutionHooks,
    ) -> ExecutionReport
    where
        T: Send + 'static,
        F: FnMut(Vec<T>) -> L::Operation + Send,
    {
        if items.is_empty() {
            return self
                .executor
                .reject("submit_bulk", OrchestrationError::EmptyInput);
        }

        let ledger = Arc::clone(&self.ledger);
        let planner = self.planner;
        self.executor
            .drive(
                "submit_bulk",
                move || async move {
                    if items.len() <= planner.max_chunk_size() {
                        return ledger
                            .build_intent(to_operation(items))
                            .await
                            .map_err(OrchestrationError::from);
                    }

                    let intents = planner
                        .materialize_via_ledger(ledger.as_ref(), items, to_operation)
                        .await?;
                    ledger
                        .compose_batch(into_vec(intents))
                        .await
                        .map_err(OrchestrationError::from)
                },
                hooks,
            )
            .await
    }
}
