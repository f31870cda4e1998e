//! Ledger client seam
//!
//! The orchestration layer never talks to a ledger directly. It consumes
//! [`LedgerClient`], which turns operation descriptions into intents and
//! composes batches, and [`TransactionIntent`], the subscribable handle an
//! executor drives to a terminal state.
//!
//! ## Subscription contract
//!
//! `subscribe` hands the intent a [`StatusSender`]; every lifecycle transition
//! is pushed through it in emission order. The returned [`Subscription`] is the
//! unsubscribe handle. It runs its release callback exactly once, either
//! through [`Subscription::unsubscribe`] or on drop.

pub mod simulated;

use crate::metrics::metrics;
use crate::orchestrator::state::{StatusChange, TransactionState};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Errors raised by a ledger client while building, composing or running an
/// intent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The signer refused or failed to sign the intent
    #[error("Signing failed: {0}")]
    Signing(String),

    /// The ledger rejected the operation at submission-time validation
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Network-level rejection or transport failure
    #[error("Network rejection: {0}")]
    Network(String),

    /// The client could not build a composite intent from the constituents
    #[error("Batch composition failed: {0}")]
    Composition(String),

    /// Anything the client cannot classify further
    #[error("Ledger error: {0}")]
    Other(String),
}

impl LedgerError {
    /// Error category for metrics labels
    pub fn category(&self) -> &'static str {
        match self {
            Self::Signing(_) => "signing",
            Self::Validation(_) => "validation",
            Self::Network(_) => "network",
            Self::Composition(_) => "composition",
            Self::Other(_) => "other",
        }
    }
}

/// Sending half of a status channel, handed to an intent on subscribe
#[derive(Debug, Clone)]
pub struct StatusSender {
    tx: mpsc::UnboundedSender<StatusChange>,
}

impl StatusSender {
    /// Create a connected sender/receiver pair
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusChange>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Push a status change; returns `false` once the receiver is gone
    pub fn emit(&self, change: StatusChange) -> bool {
        self.tx.send(change).is_ok()
    }

    /// Convenience wrapper around [`emit`](Self::emit)
    pub fn transition(
        &self,
        previous: TransactionState,
        new: TransactionState,
        diagnostic: impl Into<String>,
    ) -> bool {
        self.emit(StatusChange::new(previous, new, diagnostic))
    }

    /// Whether the executor side has stopped listening
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Unsubscribe handle returned by [`TransactionIntent::subscribe`]
///
/// The release callback runs exactly once: explicitly via
/// [`unsubscribe`](Self::unsubscribe), or automatically when the handle is
/// dropped (for example when the execution future is abandoned).
pub struct Subscription {
    label: String,
    release_fn: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Create a subscription whose release runs `release_fn`
    pub fn new<F>(label: impl Into<String>, release_fn: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        metrics().active_subscriptions.inc();
        Self {
            label: label.into(),
            release_fn: Some(Box::new(release_fn)),
        }
    }

    /// Label of the subscribed intent
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the release callback is still pending
    pub fn is_active(&self) -> bool {
        self.release_fn.is_some()
    }

    /// Explicitly release the subscription
    pub fn unsubscribe(mut self) {
        self.release("explicit");
    }

    fn release(&mut self, release_type: &'static str) {
        let Some(release_fn) = self.release_fn.take() else {
            return;
        };
        metrics().active_subscriptions.dec();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(release_fn));
        match result {
            Ok(()) => debug!(
                intent = %self.label,
                release_type = release_type,
                "Subscription released"
            ),
            Err(_) => warn!(
                intent = %self.label,
                release_type = release_type,
                "Panic caught in subscription release callback"
            ),
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("label", &self.label)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release("auto_drop");
    }
}

/// A not-yet-submitted mutating operation
///
/// Intents are moved into the executor that drives them and are never shared
/// between executors.
#[async_trait]
pub trait TransactionIntent: Send + 'static {
    /// Human-readable label used in logs
    fn label(&self) -> String {
        "intent".to_string()
    }

    /// Register `sink` for every lifecycle transition of this intent
    fn subscribe(&mut self, sink: StatusSender) -> Subscription;

    /// Commit the intent for submission
    ///
    /// Resolves once the ledger accepts or rejects the submission at the
    /// network boundary. Finality arrives later through the subscription.
    async fn run(&mut self) -> Result<(), LedgerError>;
}

/// The ledger SDK as seen by the orchestration layer
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Description of one mutating operation
    type Operation: Send + 'static;

    /// Intent type produced by this client
    type Intent: TransactionIntent;

    /// Build an intent from an operation description
    async fn build_intent(&self, operation: Self::Operation) -> Result<Self::Intent, LedgerError>;

    /// Compose an ordered list of intents into one atomic intent
    ///
    /// The ledger applies either every constituent operation or none.
    async fn compose_batch(&self, intents: Vec<Self::Intent>) -> Result<Self::Intent, LedgerError>;
}
