//! Server bootstrap: wire the service and reflection onto an already-bound
//! listener.

use std::future::Future;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tracing::info;

use strain_core::stress::MAX_STRESS_PAYLOAD;

use crate::config::ServerConfig;
use crate::pb::{test_service_server::TestServiceServer, FILE_DESCRIPTOR_SET};
use crate::service::StressService;

/// Frame limit for both directions: a full stress payload plus headroom.
pub const MAX_MESSAGE_SIZE: usize = 2 * MAX_STRESS_PAYLOAD as usize;

/// Serve `TestService` on `listener` until `shutdown` resolves.
///
/// At most `config.workers` calls run at once across all connections;
/// further calls wait for a slot. Open but idle connections take none.
pub async fn serve<F>(config: ServerConfig, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send,
{
    let local_addr = listener.local_addr().context("listener has no local address")?;

    let reflection = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build()
        .context("Failed to build gRPC reflection service")?;

    let service = TestServiceServer::new(StressService::new(config.mode, config.workers))
        .max_decoding_message_size(MAX_MESSAGE_SIZE)
        .max_encoding_message_size(MAX_MESSAGE_SIZE);

    info!(
        addr    = %local_addr,
        mode    = %config.mode,
        workers = config.workers,
        "strain server listening"
    );

    Server::builder()
        .add_service(service)
        .add_service(reflection)
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .await
        .context("gRPC server exited with an error")?;

    info!(addr = %local_addr, "strain server stopped");
    Ok(())
}
