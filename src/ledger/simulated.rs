//! In-process ledger double
//!
//! [`SimulatedLedger`] builds [`SimulatedIntent`]s that play back a scripted
//! [`Scenario`] on a background task once `run` is accepted. Shared
//! [`IntentCounters`] record every subscribe, unsubscribe and run so harnesses
//! can check the cleanup contract.

use crate::ledger::{LedgerClient, LedgerError, StatusSender, Subscription, TransactionIntent};
use crate::orchestrator::state::TransactionState;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Scripted lifecycle of a simulated intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scenario {
    /// `Unknown → Running → Succeeded`
    Succeed,
    /// `run` itself returns a network rejection
    RejectOnSubmit(String),
    /// `run` is accepted, then `Unknown → Failed`
    FailBeforeRunning(String),
    /// `Unknown → Running → Failed`
    FailAfterRunning(String),
    /// `run` is accepted and nothing is ever emitted
    Silent,
    /// `Unknown → Running`, then the status stream closes
    Vanish,
}

/// Description of one bulk or single operation for the simulated ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedOperation {
    pub action: String,
    pub items: Vec<u64>,
}

impl SimulatedOperation {
    pub fn new(action: impl Into<String>, items: Vec<u64>) -> Self {
        Self {
            action: action.into(),
            items,
        }
    }

    fn label(&self) -> String {
        format!("{}[{}]", self.action, self.items.len())
    }
}

/// Subscribe/unsubscribe/run bookkeeping shared by every intent of a ledger
#[derive(Debug, Default)]
pub struct IntentCounters {
    subscribes: AtomicUsize,
    unsubscribes: AtomicUsize,
    runs: AtomicUsize,
}

impl IntentCounters {
    pub fn subscribes(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub fn unsubscribes(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

pub struct SimulatedIntent {
    label: String,
    items: Vec<u64>,
    scenario: Scenario,
    step_delay: Duration,
    sink: Option<StatusSender>,
    counters: Arc<IntentCounters>,
}

impl SimulatedIntent {
    pub fn new(label: impl Into<String>, scenario: Scenario) -> Self {
        Self {
            label: label.into(),
            items: Vec::new(),
            scenario,
            step_delay: Duration::ZERO,
            sink: None,
            counters: Arc::new(IntentCounters::default()),
        }
    }

    pub fn with_counters(mut self, counters: Arc<IntentCounters>) -> Self {
        self.counters = counters;
        self
    }

    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    pub fn counters(&self) -> Arc<IntentCounters> {
        Arc::clone(&self.counters)
    }

    /// Items carried by this intent, in submission order
    pub fn items(&self) -> &[u64] {
        &self.items
    }

    fn script(&self) -> Vec<(TransactionState, TransactionState, String)> {
        use TransactionState::*;
        match &self.scenario {
            Scenario::Succeed => vec![
                (Unknown, Running, format!("{} accepted", self.label)),
                (Running, Succeeded, format!("{} finalized", self.label)),
            ],
            Scenario::FailBeforeRunning(reason) => vec![(Unknown, Failed, reason.clone())],
            Scenario::FailAfterRunning(reason) => vec![
                (Unknown, Running, format!("{} accepted", self.label)),
                (Running, Failed, reason.clone()),
            ],
            Scenario::Vanish => vec![(Unknown, Running, format!("{} accepted", self.label))],
            Scenario::RejectOnSubmit(_) | Scenario::Silent => Vec::new(),
        }
    }
}

#[async_trait]
impl TransactionIntent for SimulatedIntent {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn subscribe(&mut self, sink: StatusSender) -> Subscription {
        self.counters.subscribes.fetch_add(1, Ordering::SeqCst);
        self.sink = Some(sink);
        let counters = Arc::clone(&self.counters);
        Subscription::new(self.label.clone(), move || {
            counters.unsubscribes.fetch_add(1, Ordering::SeqCst);
        })
    }

    async fn run(&mut self) -> Result<(), LedgerError> {
        self.counters.runs.fetch_add(1, Ordering::SeqCst);

        if let Scenario::RejectOnSubmit(reason) = &self.scenario {
            return Err(LedgerError::Network(reason.clone()));
        }
        if self.scenario == Scenario::Silent {
            return Ok(());
        }

        let Some(sink) = self.sink.take() else {
            return Ok(());
        };
        let script = self.script();
        let step_delay = self.step_delay;
        let label = self.label.clone();

        tokio::spawn(async move {
            for (previous, new, diagnostic) in script {
                if !step_delay.is_zero() {
                    tokio::time::sleep(step_delay).await;
                }
                if !sink.transition(previous, new, diagnostic) {
                    debug!(intent = %label, "Status receiver gone, stopping playback");
                    return;
                }
            }
        });
        Ok(())
    }
}

/// Scripted ledger client
pub struct SimulatedLedger {
    scenario: Mutex<Scenario>,
    batch_scenario: Mutex<Option<Scenario>>,
    build_error: Mutex<Option<LedgerError>>,
    compose_error: Mutex<Option<LedgerError>>,
    step_delay: Duration,
    counters: Arc<IntentCounters>,
    built: AtomicUsize,
    composed: Mutex<Vec<Vec<String>>>,
}

impl SimulatedLedger {
    /// Every intent built or composed follows `scenario`
    pub fn new(scenario: Scenario) -> Self {
        Self {
            scenario: Mutex::new(scenario),
            batch_scenario: Mutex::new(None),
            build_error: Mutex::new(None),
            compose_error: Mutex::new(None),
            step_delay: Duration::ZERO,
            counters: Arc::new(IntentCounters::default()),
            built: AtomicUsize::new(0),
            composed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_step_delay(mut self, step_delay: Duration) -> Self {
        self.step_delay = step_delay;
        self
    }

    pub fn set_scenario(&self, scenario: Scenario) {
        *self.scenario.lock() = scenario;
    }

    /// Override the scenario of composite batch intents only
    pub fn set_batch_scenario(&self, scenario: Scenario) {
        *self.batch_scenario.lock() = Some(scenario);
    }

    /// Make every subsequent `build_intent` fail
    pub fn fail_builds(&self, error: LedgerError) {
        *self.build_error.lock() = Some(error);
    }

    /// Make every subsequent `compose_batch` fail
    pub fn fail_composition(&self, error: LedgerError) {
        *self.compose_error.lock() = Some(error);
    }

    pub fn counters(&self) -> Arc<IntentCounters> {
        Arc::clone(&self.counters)
    }

    /// Number of intents built through `build_intent`
    pub fn built(&self) -> usize {
        self.built.load(Ordering::SeqCst)
    }

    /// Constituent labels of every composed batch, in composition order
    pub fn composed(&self) -> Vec<Vec<String>> {
        self.composed.lock().clone()
    }

    /// Intent outside of any batch, sharing this ledger's counters
    pub fn intent(&self, label: impl Into<String>) -> SimulatedIntent {
        SimulatedIntent::new(label, self.scenario.lock().clone())
            .with_counters(self.counters())
            .with_step_delay(self.step_delay)
    }
}

#[async_trait]
impl LedgerClient for SimulatedLedger {
    type Operation = SimulatedOperation;
    type Intent = SimulatedIntent;

    async fn build_intent(
        &self,
        operation: SimulatedOperation,
    ) -> Result<SimulatedIntent, LedgerError> {
        if let Some(err) = self.build_error.lock().clone() {
            return Err(err);
        }
        self.built.fetch_add(1, Ordering::SeqCst);

        let mut intent = self.intent(operation.label());
        intent.items = operation.items;
        Ok(intent)
    }

    async fn compose_batch(
        &self,
        intents: Vec<SimulatedIntent>,
    ) -> Result<SimulatedIntent, LedgerError> {
        if let Some(err) = self.compose_error.lock().clone() {
            return Err(err);
        }
        if intents.is_empty() {
            return Err(LedgerError::Composition("no constituent intents".to_string()));
        }

        let labels: Vec<String> = intents.iter().map(|i| i.label.clone()).collect();
        let items: Vec<u64> = intents.iter().flat_map(|i| i.items.iter().copied()).collect();
        self.composed.lock().push(labels);

        let scenario = self
            .batch_scenario
            .lock()
            .clone()
            .unwrap_or_else(|| self.scenario.lock().clone());
        let mut batch = SimulatedIntent::new(format!("batch({})", intents.len()), scenario)
            .with_counters(self.counters())
            .with_step_delay(self.step_delay);
        batch.items = items;
        Ok(batch)
    }
}
