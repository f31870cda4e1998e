//! Outbound sinks consumed by the executors
//!
//! - [`Notifier`]: human-readable error strings for the operator
//! - [`StatusRelay`]: every status change, for cross-cutting observability
//! - [`RefreshHook`]: invoked once per successful terminal transition

use crate::orchestrator::state::StatusChange;
use parking_lot::Mutex;
use std::sync::Arc;

/// Notification surface receiving caught failures
pub trait Notifier: Send + Sync {
    fn notify_error(&self, message: &str);
}

/// Generic relay receiving every status change before the executor acts on it
pub trait StatusRelay: Send + Sync {
    fn relay(&self, change: &StatusChange);
}

/// Post-success refresh hook supplied by the hosting application
pub type RefreshHook = Arc<dyn Fn() + Send + Sync>;

/// Notifier that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify_error(&self, message: &str) {
        tracing::warn!(message = %message, "Operator notification");
    }
}

/// Relay that only logs
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRelay;

impl StatusRelay for TracingRelay {
    fn relay(&self, change: &StatusChange) {
        tracing::debug!(
            previous = %change.previous,
            new = %change.new,
            diagnostic = %change.diagnostic,
            "Status relay"
        );
    }
}

/// Notifier that keeps every message, for harnesses and tests
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    messages: Mutex<Vec<String>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }
}

impl Notifier for CollectingNotifier {
    fn notify_error(&self, message: &str) {
        tracing::warn!(message = %message, "Operator notification");
        self.messages.lock().push(message.to_string());
    }
}

/// Relay that keeps every change, for harnesses and tests
#[derive(Debug, Default)]
pub struct CollectingRelay {
    changes: Mutex<Vec<StatusChange>>,
}

impl CollectingRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> Vec<StatusChange> {
        self.changes.lock().clone()
    }
}

impl StatusRelay for CollectingRelay {
    fn relay(&self, change: &StatusChange) {
        self.changes.lock().push(change.clone());
    }
}
