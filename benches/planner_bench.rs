//! Benchmarks for batch planning and single-intent execution

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ledger_orchestrator::ledger::simulated::{Scenario, SimulatedLedger};
use ledger_orchestrator::orchestrator::sinks::{TracingNotifier, TracingRelay};
use ledger_orchestrator::{BatchPlanner, ExecutionHooks, SingleFlightGuard, TransactionExecutor};
use std::sync::Arc;

fn bench_plan(c: &mut Criterion) {
    let planner = BatchPlanner::new(10).unwrap();
    let mut group = c.benchmark_group("plan");

    for size in [23usize, 1_000, 100_000] {
        let items: Vec<u64> = (0..size as u64).collect();
        group.bench_with_input(BenchmarkId::from_parameter(size), &items, |b, items| {
            b.iter(|| black_box(planner.plan(black_box(items.clone())).unwrap()));
        });
    }
    group.finish();
}

fn bench_execute_success(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let ledger = SimulatedLedger::new(Scenario::Succeed);
    let executor = TransactionExecutor::new(
        Arc::new(SingleFlightGuard::new("bench")),
        Arc::new(TracingNotifier),
        Arc::new(TracingRelay),
    );

    c.bench_function("execute_success", |b| {
        b.iter(|| {
            let report =
                runtime.block_on(executor.execute(ledger.intent("bench"), ExecutionHooks::new()));
            black_box(report.is_success())
        });
    });
}

criterion_group!(benches, bench_plan, bench_execute_success);
criterion_main!(benches);
