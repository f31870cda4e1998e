//! Single-intent executor
//!
//! [`TransactionExecutor`] drives exactly one intent from creation to a
//! terminal state under the surface's single-flight token.
//!
//! ## Cleanup contract
//!
//! On every exit path (success, rejection from `run`, late failure, a caller
//! hook or sink panicking, the status stream closing, or the execution future
//! being dropped) the subscription is released exactly once and the token is
//! returned to idle. Both are released before any error reaches the
//! notification sink.
//!
//! ## Hook ordering
//!
//! `on_running` fires on entering `Running`. On entering `Succeeded`,
//! `on_succeeded` fires first, then the refresh hook. Both fire before the
//! subscription is released.

use crate::ledger::{StatusSender, TransactionIntent};
use crate::metrics::metrics;
use crate::observability::{CorrelationId, TraceContext};
use crate::orchestrator::errors::OrchestrationError;
use crate::orchestrator::guard::SingleFlightGuard;
use crate::orchestrator::sinks::{Notifier, RefreshHook, StatusRelay};
use crate::orchestrator::state::{LifecycleTracker, StatusChange, Step};
use crate::structured_logging::StructuredLogger;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

type Hook = Box<dyn FnOnce() + Send>;

/// Optional caller hooks for one submission
#[derive(Default)]
pub struct ExecutionHooks {
    on_running: Option<Hook>,
    on_succeeded: Option<Hook>,
}

impl ExecutionHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invoked once on entering `Running`
    pub fn on_running<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_running = Some(Box::new(hook));
        self
    }

    /// Invoked once on entering `Succeeded`, before the refresh hook
    pub fn on_succeeded<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_succeeded = Some(Box::new(hook));
        self
    }
}

impl std::fmt::Debug for ExecutionHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionHooks")
            .field("on_running", &self.on_running.is_some())
            .field("on_succeeded", &self.on_succeeded.is_some())
            .finish()
    }
}

/// Terminal outcome of one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[must_use]
pub enum ExecutionOutcome {
    Succeeded,
    Failed(OrchestrationError),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    pub fn error(&self) -> Option<&OrchestrationError> {
        match self {
            Self::Succeeded => None,
            Self::Failed(err) => Some(err),
        }
    }
}

/// Everything observed while driving one submission
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub correlation_id: CorrelationId,
    pub outcome: ExecutionOutcome,
    /// Status changes accepted by the lifecycle tracker, in arrival order
    pub transitions: Vec<StatusChange>,
    /// Hook panics contained during this submission
    pub hook_failures: Vec<OrchestrationError>,
    pub submitted_at: DateTime<Utc>,
    /// Time until `run()` resolved, when it was reached
    pub submission_ms: Option<u64>,
    pub total_ms: u64,
}

impl ExecutionReport {
    fn rejected(trace: &TraceContext, error: OrchestrationError) -> Self {
        Self {
            correlation_id: trace.correlation_id().clone(),
            outcome: ExecutionOutcome::Failed(error),
            transitions: Vec::new(),
            hook_failures: Vec::new(),
            submitted_at: trace.started_at,
            submission_ms: None,
            total_ms: 0,
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Drives one intent through its lifecycle under a single-flight token
#[derive(Clone)]
pub struct TransactionExecutor {
    guard: Arc<SingleFlightGuard>,
    notifier: Arc<dyn Notifier>,
    relay: Arc<dyn StatusRelay>,
    refresh: Option<RefreshHook>,
}

impl TransactionExecutor {
    pub fn new(
        guard: Arc<SingleFlightGuard>,
        notifier: Arc<dyn Notifier>,
        relay: Arc<dyn StatusRelay>,
    ) -> Self {
        Self {
            guard,
            notifier,
            relay,
            refresh: None,
        }
    }

    /// Install the global post-success refresh hook
    pub fn with_refresh_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.refresh = Some(Arc::new(hook));
        self
    }

    pub fn guard(&self) -> &Arc<SingleFlightGuard> {
        &self.guard
    }

    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    /// Submit `intent` and track it to a terminal state
    pub async fn execute<I>(&self, intent: I, hooks: ExecutionHooks) -> ExecutionReport
    where
        I: TransactionIntent,
    {
        self.drive(
            "execute",
            move || async move { Ok::<_, OrchestrationError>(intent) },
            hooks,
        )
        .await
    }

    /// Construct the intent only once the token is held, then track it
    ///
    /// A construction error is reported as `SubmissionRejected`.
    pub async fn execute_deferred<I, E, F, Fut>(
        &self,
        make: F,
        hooks: ExecutionHooks,
    ) -> ExecutionReport
    where
        I: TransactionIntent,
        E: Into<OrchestrationError>,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<I, E>> + Send,
    {
        self.drive("execute_deferred", make, hooks).await
    }

    /// Report an error that was detected before any token was taken
    pub(crate) fn reject(&self, operation: &str, error: OrchestrationError) -> ExecutionReport {
        let trace = TraceContext::new(operation, self.guard.surface());
        let logger = StructuredLogger::new(trace.correlation_id().clone());
        metrics().record_failure(error.category());
        logger.log_failure(&error, 0);
        self.notify(&error, &logger);
        ExecutionReport::rejected(&trace, error)
    }

    pub(crate) async fn drive<I, E, F, Fut>(
        &self,
        operation: &str,
        make: F,
        hooks: ExecutionHooks,
    ) -> ExecutionReport
    where
        I: TransactionIntent,
        E: Into<OrchestrationError>,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<I, E>> + Send,
    {
        let trace = TraceContext::new(operation, self.guard.surface());
        let span = trace.span();
        self.drive_in_span(trace, make, hooks).instrument(span).await
    }

    async fn drive_in_span<I, E, F, Fut>(
        &self,
        trace: TraceContext,
        make: F,
        hooks: ExecutionHooks,
    ) -> ExecutionReport
    where
        I: TransactionIntent,
        E: Into<OrchestrationError>,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<I, E>> + Send,
    {
        let correlation_id = trace.correlation_id().clone();
        let logger = StructuredLogger::new(correlation_id.clone());

        if !self.guard.try_acquire_for(correlation_id.clone()) {
            metrics().busy_rejections.inc();
            logger.log_busy(self.guard.surface(), self.guard.owner().as_ref());
            let error = OrchestrationError::Busy;
            self.notify(&error, &logger);
            return ExecutionReport::rejected(&trace, error);
        }

        metrics().submissions_total.inc();
        metrics().in_flight.inc();
        let flight = scopeguard::guard(Arc::clone(&self.guard), |guard| {
            metrics().in_flight.dec();
            guard.release();
        });

        let started = Instant::now();
        let mut run = TrackedRun {
            tracker: LifecycleTracker::new(),
            hook_failures: Vec::new(),
            submission_ms: None,
        };
        let result = self.track(make, hooks, &mut run, &logger).await;
        let total_ms = started.elapsed().as_millis() as u64;

        // Token back to idle before anything is reported
        drop(flight);

        match &result {
            Ok(()) => {
                metrics().submissions_succeeded.inc();
                metrics()
                    .finality_latency
                    .observe(started.elapsed().as_secs_f64());
                logger.log_success(total_ms);
            }
            Err(error) => {
                metrics().record_failure(error.category());
                logger.log_failure(error, total_ms);
                self.notify(error, &logger);
            }
        }
        for failure in &run.hook_failures {
            self.notify(failure, &logger);
        }

        ExecutionReport {
            correlation_id,
            outcome: match result {
                Ok(()) => ExecutionOutcome::Succeeded,
                Err(error) => ExecutionOutcome::Failed(error),
            },
            transitions: run.tracker.into_history(),
            hook_failures: run.hook_failures,
            submitted_at: trace.started_at,
            submission_ms: run.submission_ms,
            total_ms,
        }
    }

    /// Build, subscribe, run and follow the status stream to a terminal state
    ///
    /// The subscription lives entirely inside this call and is released
    /// before it returns.
    async fn track<I, E, F, Fut>(
        &self,
        make: F,
        mut hooks: ExecutionHooks,
        run: &mut TrackedRun,
        logger: &StructuredLogger,
    ) -> Result<(), OrchestrationError>
    where
        I: TransactionIntent,
        E: Into<OrchestrationError>,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<I, E>> + Send,
    {
        let mut intent = match AssertUnwindSafe(make()).catch_unwind().await {
            Ok(built) => built.map_err(Into::<OrchestrationError>::into)?,
            Err(payload) => {
                return Err(OrchestrationError::rejected(format!(
                    "intent construction panicked: {}",
                    panic_message(payload.as_ref())
                )))
            }
        };

        let (sink, mut events) = StatusSender::channel();
        let subscription = intent.subscribe(sink);
        logger.log_submission(self.guard.surface(), &intent.label());

        let run_started = Instant::now();
        let submitted = AssertUnwindSafe(intent.run()).catch_unwind().await;
        metrics()
            .submission_latency
            .observe(run_started.elapsed().as_secs_f64());
        run.submission_ms = Some(run_started.elapsed().as_millis() as u64);

        match submitted {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                subscription.unsubscribe();
                return Err(err.into());
            }
            Err(payload) => {
                subscription.unsubscribe();
                return Err(OrchestrationError::rejected(format!(
                    "run panicked: {}",
                    panic_message(payload.as_ref())
                )));
            }
        }

        let outcome = loop {
            let Some(change) = events.recv().await else {
                break Err(OrchestrationError::Abandoned {
                    last_state: run.tracker.current(),
                });
            };

            self.relay_change(&change, run, logger);
            logger.log_transition(&change);

            match run.tracker.apply(change) {
                Ok(Step::Running) => {
                    self.invoke_hook("on_running", hooks.on_running.take(), run, logger);
                }
                Ok(Step::Succeeded) => {
                    self.invoke_hook("on_succeeded", hooks.on_succeeded.take(), run, logger);
                    if let Some(refresh) = self.refresh.clone() {
                        let hook: Hook = Box::new(move || refresh());
                        self.invoke_hook("refresh", Some(hook), run, logger);
                    }
                    break Ok(());
                }
                Ok(Step::Failed {
                    after_running,
                    diagnostic,
                }) => {
                    break Err(if after_running {
                        OrchestrationError::late_failure(diagnostic)
                    } else {
                        OrchestrationError::rejected(diagnostic)
                    });
                }
                Ok(Step::Unchanged) => {}
                Err(error) => break Err(error),
            }
        };

        subscription.unsubscribe();
        outcome
    }

    /// Forward `change` to the status relay, containing a panicking relay
    fn relay_change(&self, change: &StatusChange, run: &mut TrackedRun, logger: &StructuredLogger) {
        let relay = &self.relay;
        if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(|| relay.relay(change))) {
            self.record_panic("status_relay", payload.as_ref(), run, logger);
        }
    }

    /// Report `error` to the notifier. A panicking notifier is only logged.
    fn notify(&self, error: &OrchestrationError, logger: &StructuredLogger) {
        let notifier = &self.notifier;
        let message = error.to_string();
        let result = std::panic::catch_unwind(AssertUnwindSafe(|| notifier.notify_error(&message)));
        if let Err(payload) = result {
            metrics().hook_panics.inc();
            logger.log_hook_panic("notifier", &panic_message(payload.as_ref()));
        }
    }

    fn invoke_hook(
        &self,
        name: &'static str,
        hook: Option<Hook>,
        run: &mut TrackedRun,
        logger: &StructuredLogger,
    ) {
        let Some(hook) = hook else {
            return;
        };
        if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(hook)) {
            self.record_panic(name, payload.as_ref(), run, logger);
        }
    }

    fn record_panic(
        &self,
        name: &'static str,
        payload: &(dyn Any + Send),
        run: &mut TrackedRun,
        logger: &StructuredLogger,
    ) {
        let message = panic_message(payload);
        metrics().hook_panics.inc();
        logger.log_hook_panic(name, &message);
        run.hook_failures.push(OrchestrationError::HookPanicked {
            hook: name,
            message,
        });
    }
}

/// Mutable state accumulated while tracking one intent
struct TrackedRun {
    tracker: LifecycleTracker,
    hook_failures: Vec<OrchestrationError>,
    submission_ms: Option<u64>,
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
