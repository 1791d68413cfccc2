//! Throughput statistics across benchmark trials.

use std::fmt;
use std::time::Duration;

/// One timed repetition of a benchmark batch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Trial {
    pub request_count: usize,
    pub elapsed: Duration,
}

impl Trial {
    pub fn new(request_count: usize, elapsed: Duration) -> Self {
        Self { request_count, elapsed }
    }

    /// Requests per second, i.e. `1 / elapsed_per_request`.
    ///
    /// A zero elapsed time (only possible with a clock too coarse to see the
    /// batch) is treated as one nanosecond so the result stays finite.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.max(Duration::from_nanos(1)).as_secs_f64();
        self.request_count as f64 / secs
    }
}

/// Mean, population standard deviation, min and max of per-trial throughput.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Statistics {
    pub mean: f64,
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
    pub trials: usize,
}

impl Statistics {
    /// Summarise `trials`. Returns `None` when there are none.
    pub fn from_trials(trials: &[Trial]) -> Option<Self> {
        let samples: Vec<f64> = trials.iter().map(Trial::throughput).collect();
        Self::from_samples(&samples)
    }

    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let first = *samples.first()?;
        let n = samples.len() as f64;

        let (min, max) = samples
            .iter()
            .fold((first, first), |(lo, hi), &x| (lo.min(x), hi.max(x)));

        // Identical samples: report exact zeros instead of rounding noise.
        if min == max {
            return Some(Self { mean: first, stddev: 0.0, min, max, trials: samples.len() });
        }

        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            mean: mean.clamp(min, max),
            stddev: variance.max(0.0).sqrt(),
            min,
            max,
            trials: samples.len(),
        })
    }
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "average: {:.2} RPS", self.mean)?;
        writeln!(f, "std: {:.2} RPS", self.stddev)?;
        writeln!(f, "min: {:.2} RPS", self.min)?;
        write!(f, "max: {:.2} RPS", self.max)
    }
}
