//! Standalone gateway binary: runs the TCP ingress and HTTP/WS surface with no broker wired
//! (suitable for a `GatewayNode` run outside the wiring supervisor, or local development).

use clap::Parser;
use edgeflow_gateway::GatewayConfig;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// edgeflow gateway ingress and dashboard server
#[derive(Parser, Debug)]
#[command(name = "edgeflow-gateway")]
#[command(about = "TCP ingress, jitter-buffered MJPEG streaming, and live stats dashboard")]
#[command(version)]
struct Args {
    /// Jitter buffer playback delay in seconds (0 = low latency, immediate pop).
    #[arg(long, default_value_t = 0.0)]
    buffer_delay: f64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let mut config = GatewayConfig::from_env();
    config.buffer_delay = args.buffer_delay;

    tracing::info!(tcp = %config.tcp_bind, http = %config.http_bind, "edgeflow gateway starting");
    edgeflow_gateway::serve(config).await?;
    Ok(())
}
