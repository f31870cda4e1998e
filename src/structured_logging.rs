//! Structured logging for submission lifecycle events

use crate::observability::CorrelationId;
use crate::orchestrator::errors::OrchestrationError;
use crate::orchestrator::state::StatusChange;

/// Logger stamping every event with the submission's correlation id
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    correlation_id: CorrelationId,
}

impl StructuredLogger {
    pub fn new(correlation_id: CorrelationId) -> Self {
        Self { correlation_id }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn log_submission(&self, surface: &str, intent: &str) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            surface = %surface,
            intent = %intent,
            "Submitting transaction intent"
        );
    }

    pub fn log_busy(&self, surface: &str, holder: Option<&CorrelationId>) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            surface = %surface,
            holder = ?holder.map(CorrelationId::as_str),
            "Submission refused: single-flight token held"
        );
    }

    pub fn log_transition(&self, change: &StatusChange) {
        tracing::debug!(
            correlation_id = %self.correlation_id,
            previous = %change.previous,
            new = %change.new,
            diagnostic = %change.diagnostic,
            "Status change"
        );
    }

    pub fn log_success(&self, total_ms: u64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            total_ms = total_ms,
            "Transaction succeeded"
        );
    }

    pub fn log_failure(&self, error: &OrchestrationError, total_ms: u64) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            category = error.category(),
            error = %error,
            total_ms = total_ms,
            "Transaction failed"
        );
    }

    pub fn log_hook_panic(&self, hook: &str, message: &str) {
        tracing::error!(
            correlation_id = %self.correlation_id,
            hook = %hook,
            panic_msg = %message,
            "Caller hook panicked"
        );
    }
}
