//! Per-call stream logic, generic over the inbound message stream.
//!
//! Every function here owns its per-stream state (counters, running sums)
//! and nothing else. Outbound streams are lazy generators: a response is
//! built only when the transport polls for it, so a slow or vanished
//! consumer bounds the work done on its behalf.
//!
//! An inbound `Err` means the peer aborted or the transport failed. It is
//! passed through unchanged and nothing accumulated so far is emitted.

use std::time::Instant;

use async_stream::stream;
use tokio::sync::OwnedSemaphorePermit;
use tokio_stream::{Stream, StreamExt};
use tonic::Status;
use tracing::{debug, warn};

use strain_core::stress::elapsed_ms;
use strain_core::{LegacyAggregate, ServiceLimits, StressAggregate, StressError, StressSpec};

use crate::pb::{StressRequest, StressResponse, TestRequest, TestResponse};

// ---------------------------------------------------------------------------
// Decode boundary
// ---------------------------------------------------------------------------

impl From<&StressRequest> for StressSpec {
    /// The only place `return_data` defaulting happens: unset means true.
    fn from(req: &StressRequest) -> Self {
        StressSpec {
            payload_size: req.payload_size,
            num_messages: u64::from(req.num_messages),
            delay:        std::time::Duration::from_millis(u64::from(req.delay_ms)),
            return_data:  req.return_data.unwrap_or(true),
        }
    }
}

/// Map a rejected stress request onto the RPC status space.
pub fn invalid_argument(err: StressError) -> Status {
    Status::invalid_argument(err.to_string())
}

/// Keep a worker slot for as long as `inner` is alive. The permit is
/// released when the stream finishes or the consumer drops it.
pub fn holding<S>(permit: OwnedSemaphorePermit, inner: S) -> impl Stream<Item = S::Item> + Send + 'static
where
    S: Stream + Send + 'static,
    S::Item: Send,
{
    stream! {
        let _permit = permit;
        let mut inner = Box::pin(inner);
        while let Some(item) = inner.next().await {
            yield item;
        }
    }
}

fn aborted(status: Status, what: &'static str, received: u64) -> Status {
    warn!(
        code     = ?status.code(),
        received,
        "{what} aborted before end-of-stream; discarding partial state"
    );
    status
}

// ---------------------------------------------------------------------------
// Legacy numeric streams
// ---------------------------------------------------------------------------

/// Sum `response_size` over the whole inbound stream and answer once.
pub async fn legacy_client_stream<S>(limits: ServiceLimits, mut inbound: S) -> Result<TestResponse, Status>
where
    S: Stream<Item = Result<TestRequest, Status>> + Unpin + Send,
{
    let mut agg = LegacyAggregate::default();

    while let Some(item) = inbound.next().await {
        let req = item.map_err(|s| aborted(s, "legacy client stream", agg.messages))?;
        agg.record(req.response_size);
    }

    debug!(messages = agg.messages, logical_size = agg.logical_size, "legacy client stream closed");

    Ok(TestResponse { data: limits.numeric_response(agg.logical_size) })
}

/// `count` responses, the i-th carrying `i` elements (subject to the cap).
pub fn legacy_server_stream(
    limits: ServiceLimits,
    requested: u64,
) -> impl Stream<Item = Result<TestResponse, Status>> + Send + 'static {
    let count = limits.stream_len(requested);

    stream! {
        for i in 1..=count {
            yield Ok::<_, Status>(TestResponse { data: limits.numeric_response(i) });
        }
        debug!(count, "legacy server stream complete");
    }
}

/// One response per inbound request, emitted as each request arrives.
pub fn legacy_bidi_stream<S>(
    limits: ServiceLimits,
    mut inbound: S,
) -> impl Stream<Item = Result<TestResponse, Status>> + Send + 'static
where
    S: Stream<Item = Result<TestRequest, Status>> + Unpin + Send + 'static,
{
    stream! {
        let mut answered = 0u64;
        while let Some(item) = inbound.next().await {
            match item {
                Ok(req) => {
                    answered += 1;
                    yield Ok(TestResponse { data: limits.numeric_response(req.response_size) });
                }
                Err(status) => {
                    yield Err(aborted(status, "legacy bidi stream", answered));
                    break;
                }
            }
        }
        debug!(answered, "legacy bidi stream closed");
    }
}

// ---------------------------------------------------------------------------
// Stress streams
// ---------------------------------------------------------------------------

/// One instrumented response: delay, then payload, timed from a fresh start.
async fn stress_unit(spec: &StressSpec, sequence_num: u64) -> Result<StressResponse, Status> {
    let start = Instant::now();
    spec.simulate_work().await;
    let payload = spec.payload().map_err(invalid_argument)?;

    Ok(StressResponse {
        payload,
        sequence_num,
        server_processing_time_ms: elapsed_ms(start),
        ..Default::default()
    })
}

/// Single request, single instrumented response.
pub async fn stress_unary(spec: StressSpec) -> Result<StressResponse, Status> {
    spec.validate().map_err(invalid_argument)?;
    stress_unit(&spec, 1).await
}

/// `num_messages` responses (capped in public mode), timed per message.
///
/// The request is validated before the stream is opened, so an oversized
/// payload fails the call instead of the first message.
pub fn stress_server_stream(
    limits: ServiceLimits,
    spec: StressSpec,
) -> Result<impl Stream<Item = Result<StressResponse, Status>> + Send + 'static, Status> {
    spec.validate().map_err(invalid_argument)?;
    let count = limits.stream_len(spec.num_messages);

    Ok(stream! {
        for sequence_num in 1..=count {
            match stress_unit(&spec, sequence_num).await {
                Ok(resp) => {
                    yield Ok(resp);
                }
                Err(status) => {
                    yield Err(status);
                    break;
                }
            }
        }
        debug!(count, "stress server stream complete");
    })
}

/// Count messages and sum declared payload sizes until end-of-stream.
/// Timing covers the whole stream.
pub async fn stress_client_stream<S>(mut inbound: S) -> Result<StressResponse, Status>
where
    S: Stream<Item = Result<StressRequest, Status>> + Unpin + Send,
{
    let start = Instant::now();
    let mut agg = StressAggregate::default();

    while let Some(item) = inbound.next().await {
        let req = item.map_err(|s| aborted(s, "stress client stream", agg.messages))?;
        agg.record(&StressSpec::from(&req));
    }

    debug!(
        messages = agg.messages,
        declared_payload_bytes = agg.declared_payload_bytes,
        "stress client stream closed"
    );

    Ok(StressResponse {
        sequence_num: 1,
        server_processing_time_ms: elapsed_ms(start),
        client_stream_msg_count: agg.messages,
        client_stream_total_payload_size: agg.declared_payload_bytes,
        ..Default::default()
    })
}

/// One instrumented response per inbound request, numbered by arrival.
pub fn stress_bidi_stream<S>(mut inbound: S) -> impl Stream<Item = Result<StressResponse, Status>> + Send + 'static
where
    S: Stream<Item = Result<StressRequest, Status>> + Unpin + Send + 'static,
{
    stream! {
        let mut seen = 0u64;
        while let Some(item) = inbound.next().await {
            let req = match item {
                Ok(req) => req,
                Err(status) => {
                    yield Err(aborted(status, "stress bidi stream", seen));
                    break;
                }
            };

            seen += 1;
            match stress_unit(&StressSpec::from(&req), seen).await {
                Ok(resp) => {
                    yield Ok(resp);
                }
                Err(status) => {
                    yield Err(status);
                    break;
                }
            }
        }
        debug!(seen, "stress bidi stream closed");
    }
}
