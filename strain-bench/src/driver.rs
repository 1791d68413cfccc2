//! Benchmark registry and the trial loop.
//!
//! A trial dispatches `request_count` calls through a fixed pool of worker
//! tasks and times the whole batch. Workers claim calls from a shared
//! counter, so at most `workers` calls are in flight and the rest wait their
//! turn. Trials run back to back; only their timings survive.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hdrhistogram::Histogram;
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tonic::transport::Channel;
use tonic::Status;
use tracing::{debug, info, warn};

use strain_core::{Statistics, Trial};

use crate::pb::test_service_client::TestServiceClient;
use crate::workload::{UnaryWorkload, Workload};

/// Calls per trial for the baseline `smol` benchmark.
pub const SMOL_REQUESTS: usize = 1000;

pub const DEFAULT_TRIALS: usize = 30;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("unknown benchmark {name:?} (available: {available})")]
    UnknownBenchmark { name: String, available: String },

    #[error("at least one trial is required")]
    NoTrials,

    #[error("worker pool needs at least one worker")]
    NoWorkers,

    #[error("call failed in trial {trial}: {status}")]
    CallFailed { trial: usize, status: Status },

    #[error("benchmark worker panicked: {0}")]
    WorkerPanicked(#[from] JoinError),

    #[error("latency histogram: {0}")]
    Histogram(#[from] hdrhistogram::CreationError),
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// A named workload and how many times one trial issues it.
#[derive(Clone)]
pub struct Benchmark {
    pub workload: Arc<dyn Workload>,
    pub request_count: usize,
}

impl Benchmark {
    pub fn new(workload: impl Workload, request_count: usize) -> Self {
        Self { workload: Arc::new(workload), request_count }
    }
}

#[derive(Clone, Default)]
pub struct BenchmarkRegistry {
    benchmarks: BTreeMap<String, Benchmark>,
}

impl BenchmarkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock set: just `smol`, a minimal unary call.
    pub fn baseline(client: TestServiceClient<Channel>) -> Self {
        let mut registry = Self::new();
        registry.register("smol", Benchmark::new(UnaryWorkload::smol(client), SMOL_REQUESTS));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, benchmark: Benchmark) {
        self.benchmarks.insert(name.into(), benchmark);
    }

    pub fn get(&self, name: &str) -> Option<&Benchmark> {
        self.benchmarks.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.benchmarks.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Everything one benchmark run measured.
pub struct BenchmarkReport {
    pub name: String,
    pub stats: Statistics,
    pub trials: Vec<Trial>,
    /// Per-call latency in microseconds, across all trials.
    pub latency_us: Histogram<u64>,
}

pub struct Driver {
    registry: BenchmarkRegistry,
    workers: usize,
}

impl Driver {
    /// One worker per available CPU.
    pub fn new(registry: BenchmarkRegistry) -> Self {
        Self { registry, workers: num_cpus::get() }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `num_trials` trials of benchmark `name` and summarise throughput.
    ///
    /// The first failed call aborts the run; a trial with missing calls is
    /// never reported. There is no trial timeout: a call that never returns
    /// stalls the run.
    pub async fn run_benchmark(&self, name: &str, num_trials: usize) -> Result<BenchmarkReport, BenchError> {
        let benchmark = self.registry.get(name).ok_or_else(|| BenchError::UnknownBenchmark {
            name:      name.to_owned(),
            available: self.registry.names().collect::<Vec<_>>().join(", "),
        })?;
        if num_trials == 0 {
            return Err(BenchError::NoTrials);
        }
        if self.workers == 0 {
            return Err(BenchError::NoWorkers);
        }

        info!(
            benchmark = name,
            trials    = num_trials,
            requests  = benchmark.request_count,
            workers   = self.workers,
            "starting benchmark"
        );

        let mut latency_us = Histogram::<u64>::new(3)?;
        let mut trials = Vec::with_capacity(num_trials);

        for index in 0..num_trials {
            let (trial, latencies) = self.run_trial(index, benchmark).await?;
            for latency in latencies {
                latency_us.saturating_record(latency.as_micros() as u64);
            }
            debug!(
                trial      = index,
                elapsed_ms = trial.elapsed.as_millis() as u64,
                throughput = trial.throughput(),
                "trial complete"
            );
            trials.push(trial);
        }

        let stats = Statistics::from_trials(&trials).ok_or(BenchError::NoTrials)?;

        info!(benchmark = name, mean = stats.mean, stddev = stats.stddev, "benchmark complete");

        Ok(BenchmarkReport { name: name.to_owned(), stats, trials, latency_us })
    }

    /// Time one full batch. Returns the trial and every call's latency.
    async fn run_trial(&self, index: usize, benchmark: &Benchmark) -> Result<(Trial, Vec<Duration>), BenchError> {
        let request_count = benchmark.request_count;
        let remaining = Arc::new(AtomicUsize::new(request_count));
        let mut workers = JoinSet::new();

        let start = Instant::now();

        for _ in 0..self.workers.min(request_count) {
            let workload = Arc::clone(&benchmark.workload);
            let remaining = Arc::clone(&remaining);

            workers.spawn(async move {
                let mut latencies = Vec::new();
                while claim(&remaining) {
                    let call_start = Instant::now();
                    workload.call().await?;
                    latencies.push(call_start.elapsed());
                }
                Ok::<_, Status>(latencies)
            });
        }

        let mut latencies = Vec::with_capacity(request_count);
        while let Some(joined) = workers.join_next().await {
            match joined? {
                Ok(batch) => latencies.extend(batch),
                Err(status) => {
                    warn!(trial = index, code = ?status.code(), "call failed; aborting trial");
                    workers.abort_all();
                    return Err(BenchError::CallFailed { trial: index, status });
                }
            }
        }

        let elapsed = start.elapsed();
        Ok((Trial::new(request_count, elapsed), latencies))
    }
}

/// Take one unit of work from the shared counter, if any is left.
fn claim(remaining: &AtomicUsize) -> bool {
    remaining
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        .is_ok()
}
