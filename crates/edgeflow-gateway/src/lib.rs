//! Gateway ingress server: multiplexes many upstream TCP producers into per-topic
//! jitter-buffered MJPEG streams with a live stats dashboard.
//!
//! Three concurrent pieces share one [`state::SharedState`]:
//! - [`ingress`]: the length-prefixed TCP accept loop that decodes frames and routes them by
//!   `meta["topic"]` into a per-topic [`buffer::JitterBuffer`].
//! - [`http`]: the `axum` HTTP/WS surface — MJPEG video streams, JSON introspection, the
//!   dashboard, and the `/ws/stats` broadcaster.
//! - [`stats::FpsTracker`]: windowed frames-per-second accounting, read by both the dashboard
//!   and the JSON API.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod buffer;
mod error;
mod http;
mod ingress;
mod state;
mod stats;

use std::sync::Arc;

use edgeflow_core::Broker;
use tokio::net::TcpListener;

pub use buffer::JitterBuffer;
pub use error::{GatewayError, Result};
pub use state::SharedState;
pub use stats::{FpsTracker, TopicFps};

/// Gateway runtime configuration: where to listen, how long to hold frames for reorder, and an
/// optional broker for dashboard queue-depth introspection.
pub struct GatewayConfig {
    /// Address the length-prefixed TCP ingress listens on.
    pub tcp_bind: String,
    /// Address the HTTP/WS surface listens on.
    pub http_bind: String,
    /// Jitter buffer playback delay in seconds. `0.0` is low-latency (`SPEC_FULL.md` §4.7).
    pub buffer_delay: f64,
    /// Broker used only for `/api/resources`' `queues` field; the ingress path itself never
    /// touches it.
    pub broker: Option<Arc<dyn Broker>>,
}

impl GatewayConfig {
    /// Read `GATEWAY_TCP_PORT`/`GATEWAY_HTTP_PORT` (`SPEC_FULL.md` §6), binding both to all
    /// interfaces, with no buffer delay and no broker wired.
    #[must_use]
    pub fn from_env() -> Self {
        let tcp_port: u16 = std::env::var("GATEWAY_TCP_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8080);
        let http_port: u16 =
            std::env::var("GATEWAY_HTTP_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(8000);
        Self {
            tcp_bind: format!("0.0.0.0:{tcp_port}"),
            http_bind: format!("0.0.0.0:{http_port}"),
            buffer_delay: 0.0,
            broker: None,
        }
    }
}

/// Bind both listeners and run the gateway until the HTTP server exits (on error or shutdown
/// signal handled by the caller). The TCP ingress accept loop runs as a detached background
/// task for the lifetime of the process.
///
/// # Errors
/// Returns [`GatewayError::Bind`] if either listener fails to bind, or [`GatewayError::Http`] if
/// the HTTP server itself errors while serving.
pub async fn serve(config: GatewayConfig) -> Result<()> {
    let state = Arc::new(SharedState::new(config.buffer_delay, config.broker));

    let tcp_listener = TcpListener::bind(&config.tcp_bind)
        .await
        .map_err(|source| GatewayError::Bind { what: "tcp ingress", addr: config.tcp_bind.clone(), source })?;
    tracing::info!(addr = %config.tcp_bind, "gateway ingress listening");

    let ingress_state = Arc::clone(&state);
    tokio::spawn(async move { ingress::run(tcp_listener, ingress_state).await });

    let http_listener = TcpListener::bind(&config.http_bind)
        .await
        .map_err(|source| GatewayError::Bind { what: "http", addr: config.http_bind.clone(), source })?;
    tracing::info!(addr = %config.http_bind, "gateway http surface listening");

    let app = http::router(state);
    axum::serve(http_listener, app).await.map_err(GatewayError::Http)
}
