//! In-process server on an ephemeral loopback port.

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tonic::transport::Channel;

use strain_core::ServiceMode;
use strain_server::pb::test_service_client::TestServiceClient;
use strain_server::ServerConfig;

pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<anyhow::Result<()>>>,
}

impl TestServer {
    pub async fn start(mode: ServiceMode) -> Self {
        Self::start_with(ServerConfig { mode, port: 0, workers: 12 }).await
    }

    pub async fn start_with(config: ServerConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(strain_server::serve(config, listener, async {
            let _ = rx.await;
        }));

        Self { addr, shutdown: Some(tx), handle: Some(handle) }
    }

    pub async fn client(&self) -> TestServiceClient<Channel> {
        TestServiceClient::connect(format!("http://{}", self.addr))
            .await
            .expect("connect to test server")
    }

    /// Stop the server and wait for it to exit cleanly.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            tokio::time::timeout(std::time::Duration::from_secs(5), handle)
                .await
                .expect("server stopped within 5s")
                .expect("server task")
                .expect("server exited cleanly");
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(handle) = &self.handle {
            handle.abort();
        }
    }
}
