//! Shared fixtures for orchestration tests
//!
//! - Executors wired to collecting sinks
//! - `RecordingIntent` that logs every lifecycle call into a shared journal
//! - `ScriptedIntent` that emits an arbitrary status script

use crate::ledger::{LedgerError, StatusSender, Subscription, TransactionIntent};
use crate::orchestrator::{
    CollectingNotifier, CollectingRelay, SingleFlightGuard, StatusChange, TransactionExecutor,
    TransactionState,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

pub type Journal = Arc<Mutex<Vec<&'static str>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// Executor plus the sinks it reports to
pub struct Harness {
    pub executor: TransactionExecutor,
    pub notifier: Arc<CollectingNotifier>,
    pub relay: Arc<CollectingRelay>,
}

impl Harness {
    pub fn new(surface: &str) -> Self {
        let notifier = Arc::new(CollectingNotifier::new());
        let relay = Arc::new(CollectingRelay::new());
        let executor = TransactionExecutor::new(
            Arc::new(SingleFlightGuard::new(surface)),
            notifier.clone(),
            relay.clone(),
        );
        Self {
            executor,
            notifier,
            relay,
        }
    }

    pub fn with_refresh(mut self, journal: &Journal) -> Self {
        let journal = journal.clone();
        self.executor = self
            .executor
            .with_refresh_hook(move || journal.lock().push("refresh"));
        self
    }
}

/// Intent that emits `script` synchronously from `run` and journals every call
pub struct ScriptedIntent {
    script: Vec<StatusChange>,
    journal: Journal,
    sink: Option<StatusSender>,
    panic_on_run: bool,
}

impl ScriptedIntent {
    pub fn new(script: Vec<(TransactionState, TransactionState)>, journal: &Journal) -> Self {
        Self {
            script: script
                .into_iter()
                .map(|(previous, new)| {
                    StatusChange::new(previous, new, format!("{previous}->{new}"))
                })
                .collect(),
            journal: journal.clone(),
            sink: None,
            panic_on_run: false,
        }
    }

    /// `Unknown → Running → Succeeded`
    pub fn succeeding(journal: &Journal) -> Self {
        use TransactionState::*;
        Self::new(vec![(Unknown, Running), (Running, Succeeded)], journal)
    }

    pub fn panicking(journal: &Journal) -> Self {
        let mut intent = Self::new(Vec::new(), journal);
        intent.panic_on_run = true;
        intent
    }
}

#[async_trait]
impl TransactionIntent for ScriptedIntent {
    fn label(&self) -> String {
        "scripted".to_string()
    }

    fn subscribe(&mut self, sink: StatusSender) -> Subscription {
        self.journal.lock().push("subscribe");
        self.sink = Some(sink);
        let journal = self.journal.clone();
        Subscription::new("scripted", move || journal.lock().push("unsubscribe"))
    }

    async fn run(&mut self) -> Result<(), LedgerError> {
        self.journal.lock().push("run");
        if self.panic_on_run {
            panic!("signer unavailable");
        }
        // The sink is dropped with the script so the stream closes afterwards
        if let Some(sink) = self.sink.take() {
            for change in self.script.drain(..) {
                sink.emit(change);
            }
        }
        Ok(())
    }
}
