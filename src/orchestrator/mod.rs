//! Transaction orchestration
//!
//! ## Architecture
//!
//! - **state**: lifecycle FSM (`Unknown → Running → Succeeded | Failed`)
//! - **errors**: error taxonomy shared by every component
//! - **guard**: per-surface single-flight token
//! - **sinks**: notification, status relay and refresh collaborators
//! - **executor**: drives one intent with hook dispatch and guaranteed cleanup
//! - **planner**: ordered chunking of bulk input
//! - **batch**: composes chunk intents into one atomic intent
//! - **surface**: one guard plus its executors, per control surface
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use ledger_orchestrator::ledger::simulated::{Scenario, SimulatedLedger, SimulatedOperation};
//! use ledger_orchestrator::orchestrator::sinks::{TracingNotifier, TracingRelay};
//! use ledger_orchestrator::{ControlSurface, ExecutionHooks, OrchestratorConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), ledger_orchestrator::OrchestrationError> {
//! let ledger = Arc::new(SimulatedLedger::new(Scenario::Succeed));
//! let surface = ControlSurface::new(
//!     "asset-42",
//!     ledger,
//!     &OrchestratorConfig::default(),
//!     Arc::new(TracingNotifier),
//!     Arc::new(TracingRelay),
//! )?
//! .with_refresh_hook(|| println!("refresh asset-42"));
//!
//! let items: Vec<u64> = (0..23).collect();
//! let report = surface
//!     .submit_bulk(
//!         items,
//!         |chunk| SimulatedOperation::new("redeem", chunk),
//!         ExecutionHooks::new().on_succeeded(|| println!("redeemed")),
//!     )
//!     .await;
//! assert!(report.is_success());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod errors;
pub mod executor;
pub mod guard;
pub mod planner;
pub mod sinks;
pub mod state;
pub mod surface;

pub use batch::BatchTransactionExecutor;
pub use errors::OrchestrationError;
pub use executor::{ExecutionHooks, ExecutionOutcome, ExecutionReport, TransactionExecutor};
pub use guard::SingleFlightGuard;
pub use planner::{BatchPlan, BatchPlanner};
pub use sinks::{CollectingNotifier, CollectingRelay, Notifier, RefreshHook, StatusRelay};
pub use state::{StatusChange, TransactionState};
pub use surface::ControlSurface;
