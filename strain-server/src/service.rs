//! gRPC service implementation for the `TestService` interface.
//!
//! Each RPC handler:
//!   1. Waits for a worker slot.
//!   2. Decodes the request (stress requests become a `StressSpec`).
//!   3. Delegates to the matching routine in `streams`.
//!   4. Returns the response, or the stream that will produce it.
//!
//! Slots are taken per call, never per connection, so idle clients cost
//! nothing. A streaming response carries its slot until it ends or is
//! dropped. Apart from the slot pool the service holds only the
//! `ServiceLimits` of its mode, which are never mutated.

use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_stream::Stream;
use tonic::{Request, Response, Status, Streaming};
use tracing::{debug, info, instrument};

use strain_core::{ServiceLimits, ServiceMode, StressSpec};

use crate::pb::{
    test_service_server::TestService,
    StressRequest, StressResponse,
    TestRequest, TestResponse,
};
use crate::streams;

type ResponseStream<T> = Pin<Box<dyn Stream<Item = Result<T, Status>> + Send + 'static>>;

// ---------------------------------------------------------------------------
// StressService
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct StressService {
    limits: ServiceLimits,
    slots: Arc<Semaphore>,
}

impl StressService {
    /// `workers` calls may run at once; the rest wait for a slot.
    pub fn new(mode: ServiceMode, workers: usize) -> Self {
        info!(%mode, workers, "stress service configured");
        Self {
            limits: mode.limits(),
            slots:  Arc::new(Semaphore::new(workers)),
        }
    }

    async fn admit(&self) -> Result<OwnedSemaphorePermit, Status> {
        Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| Status::unavailable("worker pool closed"))
    }
}

// ---------------------------------------------------------------------------
// RPC implementations
// ---------------------------------------------------------------------------

#[tonic::async_trait]
impl TestService for StressService {
    type TestServerStreamRPCStream = ResponseStream<TestResponse>;
    type TestBidirectionalStreamRPCStream = ResponseStream<TestResponse>;
    type StressTestServerStreamStream = ResponseStream<StressResponse>;
    type StressTestBidiStreamStream = ResponseStream<StressResponse>;

    /// Numeric response of `min(response_size, cap)` elements.
    #[instrument(name = "rpc_test", skip(self, request))]
    async fn test_rpc(
        &self,
        request: Request<TestRequest>,
    ) -> Result<Response<TestResponse>, Status> {
        let _slot = self.admit().await?;
        let req = request.into_inner();
        let data = self.limits.numeric_response(req.response_size);

        debug!(requested = req.response_size, returned = data.len(), "TestRPC");

        Ok(Response::new(TestResponse { data }))
    }

    #[instrument(name = "rpc_test_client_stream", skip(self, request))]
    async fn test_client_stream_rpc(
        &self,
        request: Request<Streaming<TestRequest>>,
    ) -> Result<Response<TestResponse>, Status> {
        let _slot = self.admit().await?;
        let resp = streams::legacy_client_stream(self.limits, request.into_inner()).await?;
        Ok(Response::new(resp))
    }

    /// `response_size` is read as the number of messages to stream back.
    #[instrument(name = "rpc_test_server_stream", skip(self, request))]
    async fn test_server_stream_rpc(
        &self,
        request: Request<TestRequest>,
    ) -> Result<Response<Self::TestServerStreamRPCStream>, Status> {
        let slot = self.admit().await?;
        let req = request.into_inner();
        debug!(requested = req.response_size, "TestServerStreamRPC");

        let output = streams::holding(slot, streams::legacy_server_stream(self.limits, req.response_size));
        Ok(Response::new(Box::pin(output) as Self::TestServerStreamRPCStream))
    }

    #[instrument(name = "rpc_test_bidi_stream", skip(self, request))]
    async fn test_bidirectional_stream_rpc(
        &self,
        request: Request<Streaming<TestRequest>>,
    ) -> Result<Response<Self::TestBidirectionalStreamRPCStream>, Status> {
        let slot = self.admit().await?;
        let output = streams::holding(slot, streams::legacy_bidi_stream(self.limits, request.into_inner()));
        Ok(Response::new(Box::pin(output) as Self::TestBidirectionalStreamRPCStream))
    }

    #[instrument(name = "rpc_stress_unary", skip(self, request))]
    async fn stress_test_unary(
        &self,
        request: Request<StressRequest>,
    ) -> Result<Response<StressResponse>, Status> {
        let _slot = self.admit().await?;
        let spec = StressSpec::from(request.get_ref());
        let resp = streams::stress_unary(spec).await?;
        Ok(Response::new(resp))
    }

    #[instrument(name = "rpc_stress_server_stream", skip(self, request))]
    async fn stress_test_server_stream(
        &self,
        request: Request<StressRequest>,
    ) -> Result<Response<Self::StressTestServerStreamStream>, Status> {
        let slot = self.admit().await?;
        let spec = StressSpec::from(request.get_ref());
        debug!(
            num_messages = spec.num_messages,
            payload_size = spec.payload_size,
            delay_ms     = spec.delay.as_millis() as u64,
            return_data  = spec.return_data,
            "StressTestServerStream"
        );

        let output = streams::stress_server_stream(self.limits, spec)?;
        let output = streams::holding(slot, output);
        Ok(Response::new(Box::pin(output) as Self::StressTestServerStreamStream))
    }

    #[instrument(name = "rpc_stress_client_stream", skip(self, request))]
    async fn stress_test_client_stream(
        &self,
        request: Request<Streaming<StressRequest>>,
    ) -> Result<Response<StressResponse>, Status> {
        let _slot = self.admit().await?;
        let resp = streams::stress_client_stream(request.into_inner()).await?;
        Ok(Response::new(resp))
    }

    #[instrument(name = "rpc_stress_bidi_stream", skip(self, request))]
    async fn stress_test_bidi_stream(
        &self,
        request: Request<Streaming<StressRequest>>,
    ) -> Result<Response<Self::StressTestBidiStreamStream>, Status> {
        let slot = self.admit().await?;
        let output = streams::holding(slot, streams::stress_bidi_stream(request.into_inner()));
        Ok(Response::new(Box::pin(output) as Self::StressTestBidiStreamStream))
    }
}
