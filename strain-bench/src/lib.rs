//! Throughput benchmark driver for the strain stress service.

pub mod driver;
pub mod workload;

// Import generated proto code
pub mod pb {
    // MUST match "package strain;" from the proto file
    tonic::include_proto!("strain");
}

pub use driver::{BenchError, Benchmark, BenchmarkRegistry, BenchmarkReport, Driver};
pub use workload::{UnaryWorkload, Workload};
