//! Transport-independent model of a stress request and the per-stream
//! accumulators used by the client-streaming handlers.

use std::time::{Duration, Instant};

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

use crate::payload::generate_payload;

/// Largest payload a single stress response may carry.
pub const MAX_STRESS_PAYLOAD: u64 = 4 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StressError {
    #[error("payload_size {requested} exceeds the {limit}-byte limit")]
    PayloadTooLarge { requested: u64, limit: u64 },
}

// ---------------------------------------------------------------------------
// StressSpec
// ---------------------------------------------------------------------------

/// One decoded stress request, with schema defaults already applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StressSpec {
    /// Declared payload size in bytes.
    pub payload_size: u64,
    /// Messages to emit; only meaningful for server streams.
    pub num_messages: u64,
    /// Simulated processing cost per message.
    pub delay: Duration,
    pub return_data: bool,
}

impl StressSpec {
    /// Reject payloads above `MAX_STRESS_PAYLOAD`.
    pub fn validate(&self) -> Result<(), StressError> {
        if self.payload_size > MAX_STRESS_PAYLOAD {
            return Err(StressError::PayloadTooLarge {
                requested: self.payload_size,
                limit:     MAX_STRESS_PAYLOAD,
            });
        }
        Ok(())
    }

    /// Payload for one response: empty when the client opted out.
    pub fn payload(&self) -> Result<Bytes, StressError> {
        self.validate()?;
        if !self.return_data {
            return Ok(Bytes::new());
        }
        Ok(generate_payload(self.payload_size as usize))
    }

    /// Sleep for the configured delay, if any. Only the calling task waits.
    pub async fn simulate_work(&self) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
    }
}

/// Whole milliseconds since `start`.
pub fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

// ---------------------------------------------------------------------------
// Accumulators
// ---------------------------------------------------------------------------

/// Running total for the legacy client stream: the sum of requested
/// response sizes, a *logical* size that decides the response length.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LegacyAggregate {
    pub messages: u64,
    pub logical_size: u64,
}

impl LegacyAggregate {
    pub fn record(&mut self, response_size: u64) {
        self.messages += 1;
        self.logical_size = self.logical_size.saturating_add(response_size);
    }
}

/// Running total for the stress client stream: message count and the sum
/// of *declared* payload sizes. Bytes actually on the wire are not counted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StressAggregate {
    pub messages: u64,
    pub declared_payload_bytes: u64,
}

impl StressAggregate {
    pub fn record(&mut self, spec: &StressSpec) {
        self.messages += 1;
        self.declared_payload_bytes = self.declared_payload_bytes.saturating_add(spec.payload_size);
        debug!(
            messages = self.messages,
            declared_payload_bytes = self.declared_payload_bytes,
            "stress stream message recorded"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(payload_size: u64, return_data: bool) -> StressSpec {
        StressSpec {
            payload_size,
            num_messages: 1,
            delay: Duration::ZERO,
            return_data,
        }
    }

    #[test]
    fn payload_honours_return_data() {
        assert_eq!(spec(64, true).payload().unwrap().len(), 64);
        assert!(spec(64, false).payload().unwrap().is_empty());
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let err = spec(MAX_STRESS_PAYLOAD + 1, true).payload().unwrap_err();
        assert_eq!(
            err,
            StressError::PayloadTooLarge { requested: MAX_STRESS_PAYLOAD + 1, limit: MAX_STRESS_PAYLOAD }
        );
        // Rejected even when no data would be returned.
        assert!(spec(MAX_STRESS_PAYLOAD + 1, false).validate().is_err());
        assert!(spec(MAX_STRESS_PAYLOAD, true).validate().is_ok());
    }

    #[test]
    fn legacy_aggregate_sums_logical_sizes() {
        let mut agg = LegacyAggregate::default();
        for size in [2, 3, 5] {
            agg.record(size);
        }
        assert_eq!(agg, LegacyAggregate { messages: 3, logical_size: 10 });
    }

    #[test]
    fn legacy_aggregate_saturates() {
        let mut agg = LegacyAggregate::default();
        agg.record(u64::MAX);
        agg.record(1);
        assert_eq!(agg.logical_size, u64::MAX);
    }

    #[test]
    fn stress_aggregate_counts_declared_bytes() {
        let mut agg = StressAggregate::default();
        agg.record(&spec(100, false));
        agg.record(&spec(250, true));
        assert_eq!(agg, StressAggregate { messages: 2, declared_payload_bytes: 350 });
    }

    #[tokio::test]
    async fn simulate_work_waits_at_least_the_delay() {
        let s = StressSpec { delay: Duration::from_millis(15), ..spec(0, true) };
        let start = Instant::now();
        s.simulate_work().await;
        assert!(elapsed_ms(start) >= 15);
    }
}
