//! Spins up a real [`edgeflow_gateway`] instance as a background task, for scenarios that send
//! it real frames over TCP and read its HTTP surface back.

use std::{sync::Arc, time::Duration};

use edgeflow_core::Broker;
use edgeflow_gateway::GatewayConfig;

/// A gateway bound to caller-chosen ports and run as a background task for the life of the
/// handle. Aborted on drop.
pub struct GatewayUnderTest {
    /// Base URL for the HTTP surface, e.g. `http://127.0.0.1:18801`.
    pub http_base: String,
    /// `host:port` the TCP ingress listens on, e.g. `127.0.0.1:18800`.
    pub tcp_addr: String,
    handle: tokio::task::JoinHandle<()>,
}

impl GatewayUnderTest {
    /// Start a gateway on `tcp_port`/`http_port`.
    ///
    /// `edgeflow_gateway::serve` binds its own listeners and never hands the resolved address
    /// back, so callers pick fixed, per-scenario ports rather than `0` — each scenario in this
    /// crate uses its own port pair to stay independent of the others under parallel test
    /// execution.
    pub async fn spawn(tcp_port: u16, http_port: u16, broker: Option<Arc<dyn Broker>>) -> Self {
        let config = GatewayConfig {
            tcp_bind: format!("127.0.0.1:{tcp_port}"),
            http_bind: format!("127.0.0.1:{http_port}"),
            buffer_delay: 0.0,
            broker,
        };

        let handle = tokio::spawn(async move {
            if let Err(error) = edgeflow_gateway::serve(config).await {
                tracing::error!(%error, "test gateway exited");
            }
        });

        // Give both listeners a moment to bind before a caller tries to connect.
        tokio::time::sleep(Duration::from_millis(100)).await;

        Self {
            http_base: format!("http://127.0.0.1:{http_port}"),
            tcp_addr: format!("127.0.0.1:{tcp_port}"),
            handle,
        }
    }
}

impl Drop for GatewayUnderTest {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
