//! Driver behaviour against in-memory workloads.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tonic::Status;

use strain_bench::{BenchError, Benchmark, BenchmarkRegistry, Driver, Workload};

/// Counts calls and tracks the peak number in flight.
#[derive(Default)]
struct Probe {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
    fail_at: Option<usize>,
}

#[derive(Clone)]
struct ProbeWorkload(Arc<Probe>);

#[tonic::async_trait]
impl Workload for ProbeWorkload {
    async fn call(&self) -> Result<(), Status> {
        let probe = &self.0;
        let n = probe.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let now = probe.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        probe.peak.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(probe.delay).await;
        probe.in_flight.fetch_sub(1, Ordering::SeqCst);

        match probe.fail_at {
            Some(at) if n == at => Err(Status::unavailable("injected failure")),
            _ => Ok(()),
        }
    }
}

fn driver_for(probe: &Arc<Probe>, request_count: usize, workers: usize) -> Driver {
    let mut registry = BenchmarkRegistry::new();
    registry.register("probe", Benchmark::new(ProbeWorkload(Arc::clone(probe)), request_count));
    Driver::new(registry).with_workers(workers)
}

#[tokio::test]
async fn every_trial_issues_the_full_batch() {
    let probe = Arc::new(Probe::default());
    let report = driver_for(&probe, 50, 4).run_benchmark("probe", 3).await.unwrap();

    assert_eq!(probe.calls.load(Ordering::SeqCst), 150);
    assert_eq!(report.trials.len(), 3);
    assert!(report.trials.iter().all(|t| t.request_count == 50));
    assert_eq!(report.latency_us.len(), 150);
}

#[tokio::test]
async fn in_flight_calls_never_exceed_workers() {
    let probe = Arc::new(Probe { delay: Duration::from_millis(5), ..Default::default() });
    driver_for(&probe, 40, 3).run_benchmark("probe", 1).await.unwrap();

    let peak = probe.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak in flight was {peak}");
    assert!(peak >= 2, "pool never ran calls concurrently");
}

#[tokio::test]
async fn statistics_are_consistent() {
    let probe = Arc::new(Probe { delay: Duration::from_millis(1), ..Default::default() });
    let report = driver_for(&probe, 20, 4).run_benchmark("probe", 4).await.unwrap();
    let stats = report.stats;

    assert_eq!(stats.trials, 4);
    assert!(stats.min > 0.0);
    assert!(stats.min <= stats.mean && stats.mean <= stats.max);
    assert!(stats.stddev >= 0.0);
}

#[tokio::test]
async fn failed_call_aborts_the_run() {
    let probe = Arc::new(Probe { fail_at: Some(7), ..Default::default() });
    let Err(err) = driver_for(&probe, 30, 2).run_benchmark("probe", 5).await else {
        panic!("run should fail");
    };

    match err {
        BenchError::CallFailed { trial, status } => {
            assert_eq!(trial, 0);
            assert_eq!(status.code(), tonic::Code::Unavailable);
        }
        other => panic!("unexpected error: {other}"),
    }
    // No later trial was started.
    assert!(probe.calls.load(Ordering::SeqCst) <= 30);
}

#[tokio::test]
async fn rejects_unknown_names_and_empty_runs() {
    let probe = Arc::new(Probe::default());
    let driver = driver_for(&probe, 10, 2);

    assert!(matches!(
        driver.run_benchmark("huge", 1).await,
        Err(BenchError::UnknownBenchmark { .. })
    ));
    assert!(matches!(driver.run_benchmark("probe", 0).await, Err(BenchError::NoTrials)));

    let idle = driver_for(&probe, 10, 0);
    assert!(matches!(idle.run_benchmark("probe", 1).await, Err(BenchError::NoWorkers)));
    assert_eq!(probe.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn default_pool_matches_cpu_count() {
    let driver = Driver::new(BenchmarkRegistry::new());
    assert_eq!(driver.workers(), num_cpus::get());
}
