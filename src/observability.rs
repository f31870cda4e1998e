//! Correlation and trace identifiers for submissions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation ID tying together every log line of one submission
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CorrelationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CorrelationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Trace context opened for every submission
///
/// Carries the correlation id handed to the single-flight guard and the
/// structured logger, and produces the `tracing` span the submission runs in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceContext {
    pub trace_id: String,
    pub correlation_id: CorrelationId,
    /// Executor entry point (`execute`, `execute_batch`, `submit_bulk`, ...)
    pub operation: String,
    /// Control surface the submission belongs to
    pub surface: String,
    pub started_at: DateTime<Utc>,
}

impl TraceContext {
    pub fn new(operation: &str, surface: &str) -> Self {
        Self {
            trace_id: Uuid::new_v4().to_string(),
            correlation_id: CorrelationId::new(),
            operation: operation.to_string(),
            surface: surface.to_string(),
            started_at: Utc::now(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    /// Span wrapping the whole submission
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "submission",
            trace_id = %self.trace_id,
            correlation_id = %self.correlation_id,
            operation = %self.operation,
            surface = %self.surface,
        )
    }
}
