//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub submissions_total: IntCounter,
    pub submissions_succeeded: IntCounter,
    pub submissions_failed: IntCounterVec,
    pub busy_rejections: IntCounter,
    pub hook_panics: IntCounter,
    pub batches_planned: IntCounter,
    pub chunks_planned: IntCounter,

    // Gauges
    pub in_flight: IntGauge,
    pub active_subscriptions: IntGauge,

    // Histograms
    pub submission_latency: Histogram,
    pub finality_latency: Histogram,
    pub batch_size: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let submissions_total = IntCounter::with_opts(Opts::new(
            "orchestrator_submissions_total",
            "Submissions that acquired the single-flight token",
        ))?;

        let submissions_succeeded = IntCounter::with_opts(Opts::new(
            "orchestrator_submissions_succeeded",
            "Submissions that reached Succeeded",
        ))?;

        let submissions_failed = IntCounterVec::new(
            Opts::new(
                "orchestrator_submissions_failed",
                "Failed submissions by error category",
            ),
            &["category"],
        )?;

        let busy_rejections = IntCounter::with_opts(Opts::new(
            "orchestrator_busy_rejections",
            "Submissions refused because the surface was busy",
        ))?;

        let hook_panics = IntCounter::with_opts(Opts::new(
            "orchestrator_hook_panics",
            "Caller hooks that panicked",
        ))?;

        let batches_planned = IntCounter::with_opts(Opts::new(
            "orchestrator_batches_planned",
            "Bulk inputs partitioned by the planner",
        ))?;

        let chunks_planned = IntCounter::with_opts(Opts::new(
            "orchestrator_chunks_planned",
            "Chunks produced by the planner",
        ))?;

        let in_flight = IntGauge::with_opts(Opts::new(
            "orchestrator_in_flight",
            "Submissions currently holding a single-flight token",
        ))?;

        let active_subscriptions = IntGauge::with_opts(Opts::new(
            "orchestrator_active_subscriptions",
            "Status subscriptions not yet released",
        ))?;

        let submission_latency = Histogram::with_opts(
            HistogramOpts::new(
                "orchestrator_submission_latency_seconds",
                "Time for run() to be accepted or rejected",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0]),
        )?;

        let finality_latency = Histogram::with_opts(
            HistogramOpts::new(
                "orchestrator_finality_latency_seconds",
                "Time from submission to a terminal state",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        let batch_size = Histogram::with_opts(
            HistogramOpts::new(
                "orchestrator_batch_size",
                "Constituent intents per composite batch",
            )
            .buckets(vec![1.0, 2.0, 3.0, 5.0, 10.0, 20.0, 50.0]),
        )?;

        registry.register(Box::new(submissions_total.clone()))?;
        registry.register(Box::new(submissions_succeeded.clone()))?;
        registry.register(Box::new(submissions_failed.clone()))?;
        registry.register(Box::new(busy_rejections.clone()))?;
        registry.register(Box::new(hook_panics.clone()))?;
        registry.register(Box::new(batches_planned.clone()))?;
        registry.register(Box::new(chunks_planned.clone()))?;
        registry.register(Box::new(in_flight.clone()))?;
        registry.register(Box::new(active_subscriptions.clone()))?;
        registry.register(Box::new(submission_latency.clone()))?;
        registry.register(Box::new(finality_latency.clone()))?;
        registry.register(Box::new(batch_size.clone()))?;

        Ok(Self {
            registry,
            submissions_total,
            submissions_succeeded,
            submissions_failed,
            busy_rejections,
            hook_panics,
            batches_planned,
            chunks_planned,
            in_flight,
            active_subscriptions,
            submission_latency,
            finality_latency,
            batch_size,
        })
    }

    pub fn record_failure(&self, category: &str) {
        self.submissions_failed.with_label_values(&[category]).inc();
    }

    /// Render every metric in the Prometheus text exposition format
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_registered_metrics() {
        let m = Metrics::new().unwrap();
        m.submissions_total.inc();
        m.record_failure("late_failure");

        let text = m.render().unwrap();
        assert!(text.contains("orchestrator_submissions_total 1"));
        assert!(text.contains("category=\"late_failure\""));
    }
}
