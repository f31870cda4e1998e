//! Ledger transaction orchestration
//!
//! This library drives mutating ledger operations from submission to
//! finality on behalf of an operator console:
//!
//! - [`orchestrator::TransactionExecutor`] runs one intent, relays status
//!   changes and invokes caller hooks
//! - [`orchestrator::BatchPlanner`] splits bulk input into ordered chunks
//! - [`orchestrator::BatchTransactionExecutor`] composes chunk intents into one
//!   atomic batch
//! - [`orchestrator::SingleFlightGuard`] keeps one submission in flight per
//!   control surface
//!
//! The ledger itself is reached through the [`ledger::LedgerClient`] and
//! [`ledger::TransactionIntent`] traits.

pub mod config;
pub mod ledger;
pub mod metrics;
pub mod observability;
pub mod orchestrator;
pub mod structured_logging;


pub use config::OrchestratorConfig;
pub use ledger::{LedgerClient, LedgerError, StatusSender, Subscription, TransactionIntent};
pub use orchestrator::{
    BatchPlan, BatchPlanner, BatchTransactionExecutor, ControlSurface, ExecutionHooks,
    ExecutionOutcome, ExecutionReport, OrchestrationError, SingleFlightGuard, StatusChange,
    TransactionExecutor, TransactionState,
};
