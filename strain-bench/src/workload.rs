//! The calls a benchmark issues.

use tonic::transport::Channel;
use tonic::Status;

use crate::pb::test_service_client::TestServiceClient;
use crate::pb::TestRequest;

/// One benchmarked call. Implementations are shared by every worker.
#[tonic::async_trait]
pub trait Workload: Send + Sync + 'static {
    async fn call(&self) -> Result<(), Status>;
}

/// Repeats one unary `TestRPC` with a request built up front.
///
/// The request is constructed once so that only transport cost is measured;
/// each call clones the ready-made message instead of rebuilding it.
#[derive(Clone, Debug)]
pub struct UnaryWorkload {
    client: TestServiceClient<Channel>,
    request: TestRequest,
}

impl UnaryWorkload {
    pub fn new(client: TestServiceClient<Channel>, request: TestRequest) -> Self {
        Self { client, request }
    }

    /// The minimal call: one element requested, one element sent.
    pub fn smol(client: TestServiceClient<Channel>) -> Self {
        Self::new(client, TestRequest { response_size: 1, data: vec![0] })
    }
}

#[tonic::async_trait]
impl Workload for UnaryWorkload {
    async fn call(&self) -> Result<(), Status> {
        // Clients share one underlying channel; cloning is cheap.
        let mut client = self.client.clone();
        client.test_rpc(self.request.clone()).await?;
        Ok(())
    }
}
