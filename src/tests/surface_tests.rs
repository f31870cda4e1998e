//! Control surface scenarios: bulk submission and per-surface exclusion

use crate::config::OrchestratorConfig;
use crate::ledger::simulated::{Scenario, SimulatedLedger, SimulatedOperation};
use crate::orchestrator::{
    CollectingNotifier, CollectingRelay, ControlSurface, ExecutionHooks, ExecutionOutcome,
    OrchestrationError,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn surface(
    name: &str,
    ledger: &Arc<SimulatedLedger>,
) -> (ControlSurface<SimulatedLedger>, Arc<CollectingNotifier>) {
    let notifier = Arc::new(CollectingNotifier::new());
    let surface = ControlSurface::new(
        name,
        ledger.clone(),
        &OrchestratorConfig::default(),
        notifier.clone(),
        Arc::new(CollectingRelay::new()),
    )
    .unwrap();
    (surface, notifier)
}

fn redeem(chunk: Vec<u64>) -> SimulatedOperation {
    SimulatedOperation::new("redeem", chunk)
}

#[tokio::test]
async fn test_small_bulk_is_submitted_without_batch() {
    let ledger = Arc::new(SimulatedLedger::new(Scenario::Succeed));
    let (surface, notifier) = surface("asset-3", &ledger);

    let report = surface
        .submit_bulk((0..5).collect(), redeem, ExecutionHooks::new())
        .await;

    assert!(report.is_success());
    assert_eq!(ledger.built(), 1);
    assert!(ledger.composed().is_empty());
    assert!(notifier.is_empty());
}

#[tokio::test]
async fn test_large_bulk_is_one_atomic_batch() {
    let ledger = Arc::new(SimulatedLedger::new(Scenario::Succeed));
    let refreshed = Arc::new(AtomicUsize::new(0));
    let seen = refreshed.clone();
    let (surface, _) = surface("asset-3", &ledger);
    let surface = surface.with_refresh_hook(move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });

    let report = surface
        .submit_bulk((0..23).collect(), redeem, ExecutionHooks::new())
        .await;

    assert!(report.is_success());
    assert_eq!(ledger.built(), 3);
    assert_eq!(ledger.composed().len(), 1);
    assert_eq!(ledger.counters().runs(), 1);
    assert_eq!(refreshed.load(Ordering::SeqCst), 1);
    assert!(!surface.is_busy());
}

#[tokio::test]
async fn test_empty_bulk_builds_nothing() {
    let ledger = Arc::new(SimulatedLedger::new(Scenario::Succeed));
    let (surface, notifier) = surface("asset-3", &ledger);

    let report = surface
        .submit_bulk(Vec::new(), redeem, ExecutionHooks::new())
        .await;

    assert_eq!(report.outcome, ExecutionOutcome::Failed(OrchestrationError::EmptyInput));
    assert_eq!(ledger.built(), 0);
    assert_eq!(notifier.len(), 1);
}

#[tokio::test]
async fn test_build_failure_rejects_whole_bulk() {
    let ledger = Arc::new(SimulatedLedger::new(Scenario::Succeed));
    ledger.fail_builds(crate::ledger::LedgerError::Validation("unknown item".into()));
    let (surface, notifier) = surface("asset-3", &ledger);

    let report = surface
        .submit_bulk((0..23).collect(), redeem, ExecutionHooks::new())
        .await;

    assert_eq!(
        report.outcome.error(),
        Some(&OrchestrationError::rejected("Validation failed: unknown item"))
    );
    assert!(ledger.composed().is_empty());
    assert_eq!(notifier.len(), 1);
    assert!(!surface.is_busy());
}

#[tokio::test]
async fn test_busy_surface_does_not_build() {
    let ledger = Arc::new(SimulatedLedger::new(Scenario::Silent));
    let (surface, notifier) = surface("asset-3", &ledger);
    let surface = Arc::new(surface);

    let mut busy = surface.busy_watch();
    let holder = surface.clone();
    let in_flight =
        tokio::spawn(async move { holder.submit(redeem(vec![1]), ExecutionHooks::new()).await });
    busy.wait_for(|b| *b).await.unwrap();

    let report = surface.submit(redeem(vec![2]), ExecutionHooks::new()).await;
    assert_eq!(report.outcome, ExecutionOutcome::Failed(OrchestrationError::Busy));
    assert_eq!(ledger.built(), 1);
    assert_eq!(notifier.len(), 1);

    in_flight.abort();
    let _ = in_flight.await;
    assert!(!surface.is_busy());
}

#[tokio::test]
async fn test_surfaces_run_independently() {
    let ledger = Arc::new(SimulatedLedger::new(Scenario::Silent));
    let (first, _) = surface("asset-1", &ledger);
    let (second, _) = surface("asset-2", &ledger);
    let (first, second) = (Arc::new(first), Arc::new(second));

    let mut first_busy = first.busy_watch();
    let mut second_busy = second.busy_watch();

    let a = {
        let surface = first.clone();
        tokio::spawn(async move { surface.submit(redeem(vec![1]), ExecutionHooks::new()).await })
    };
    let b = {
        let surface = second.clone();
        tokio::spawn(async move { surface.submit(redeem(vec![2]), ExecutionHooks::new()).await })
    };
    first_busy.wait_for(|b| *b).await.unwrap();
    second_busy.wait_for(|b| *b).await.unwrap();

    assert!(first.is_busy() && second.is_busy());
    assert!(first.guard().owner().is_some());
    assert_ne!(first.guard().owner(), second.guard().owner());

    a.abort();
    b.abort();
    let _ = a.await;
    let _ = b.await;
    assert!(!first.is_busy());
    assert!(!second.is_busy());
    assert_eq!(ledger.counters().unsubscribes(), 2);
}

#[test]
fn test_zero_chunk_size_rejected_at_construction() {
    let mut config = OrchestratorConfig::default();
    config.batch.max_chunk_size = 0;

    let result = ControlSurface::new(
        "asset-9",
        Arc::new(SimulatedLedger::new(Scenario::Succeed)),
        &config,
        Arc::new(CollectingNotifier::new()),
        Arc::new(CollectingRelay::new()),
    );

    assert!(matches!(result, Err(OrchestrationError::InvalidChunkSize(0))));
}

#[test]
fn test_invalid_log_level_rejected_at_construction() {
    let mut config = OrchestratorConfig::default();
    config.logging.level = "loud".to_string();

    let result = ControlSurface::new(
        "asset-9",
        Arc::new(SimulatedLedger::new(Scenario::Succeed)),
        &config,
        Arc::new(CollectingNotifier::new()),
        Arc::new(CollectingRelay::new()),
    );

    match result {
        Err(OrchestrationError::Configuration(message)) => {
            assert!(message.contains("logging.level"));
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("invalid config accepted"),
    }
}
