use anyhow::Context;
use clap::Parser;
use tonic::transport::Channel;
use tracing_subscriber::EnvFilter;

use strain_bench::driver::DEFAULT_TRIALS;
use strain_bench::pb::test_service_client::TestServiceClient;
use strain_bench::{BenchmarkRegistry, Driver};

/// Measure unary throughput of a running strain server.
#[derive(Parser, Debug)]
#[clap(version, about, long_about = None)]
struct Args {
    /// Benchmark to run
    #[clap(short = 'b', long, default_value = "smol")]
    benchmark: String,

    /// Number of timed trials
    #[clap(short = 'n', long, default_value_t = DEFAULT_TRIALS)]
    trials: usize,

    /// Server endpoint
    #[clap(short = 'e', long, default_value = "http://127.0.0.1:8001")]
    endpoint: String,

    /// Concurrent calls in flight (default: one per CPU)
    #[clap(short = 'w', long)]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only the report.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("strain_bench=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // 1. Connect to the Server
    let channel = Channel::from_shared(args.endpoint.clone())
        .with_context(|| format!("invalid endpoint {:?}", args.endpoint))?
        .connect()
        .await
        .with_context(|| format!("Failed to connect to {}. Is the server running?", args.endpoint))?;
    let client = TestServiceClient::new(channel);

    // 2. Run the trials
    let mut driver = Driver::new(BenchmarkRegistry::baseline(client));
    if let Some(workers) = args.workers {
        driver = driver.with_workers(workers);
    }
    let report = driver
        .run_benchmark(&args.benchmark, args.trials)
        .await
        .with_context(|| format!("benchmark {:?} failed", args.benchmark))?;

    // 3. The Report
    println!("{}", report.stats);
    println!("p50 latency: {} µs", report.latency_us.value_at_quantile(0.50));
    println!("p99 latency: {} µs", report.latency_us.value_at_quantile(0.99));

    Ok(())
}
