//! HTTP/WS surface: MJPEG video streams, the JSON introspection API, the static dashboard, and
//! the `/ws/stats` broadcaster.
//!
//! Grounded in `WebInterface` (`examples/original_source/edgeflow/nodes/gateway/interfaces/
//! web.py`): same route table, same stream-generator timeout/throttle constants, same
//! once-per-100ms stats broadcast. `axum` replaces FastAPI/uvicorn; `tokio_stream` replaces the
//! Python async generator feeding `StreamingResponse`.

use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::{
    Router,
    body::Body,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{Redirect, Response},
    routing::get,
};
use bytes::{Bytes, BytesMut};
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::ReceiverStream;

use crate::state::{DEFAULT_TOPIC, SharedState};

const NO_DATA_TIMEOUT: Duration = Duration::from_secs(2);
const PLACEHOLDER_THROTTLE: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(10);
const STATS_BROADCAST_INTERVAL: Duration = Duration::from_millis(100);
const STATS_CHANNEL_CAPACITY: usize = 16;

/// Shared state plus the stats broadcast channel every `/ws/stats` connection subscribes to.
struct AppState {
    gateway: Arc<SharedState>,
    stats_tx: broadcast::Sender<Arc<str>>,
}

/// Build the axum router and spawn the background stats broadcaster. Returns the router ready
/// to be served.
pub fn router(gateway: Arc<SharedState>) -> Router {
    let (stats_tx, _rx) = broadcast::channel(STATS_CHANNEL_CAPACITY);
    let app_state = Arc::new(AppState { gateway: Arc::clone(&gateway), stats_tx: stats_tx.clone() });

    tokio::spawn(broadcast_stats(gateway, stats_tx));

    Router::new()
        .route("/", get(root))
        .route("/dashboard", get(dashboard))
        .route("/video", get(video_default))
        .route("/video/{topic}", get(video_topic))
        .route("/health", get(health))
        .route("/api/status", get(api_status))
        .route("/api/fps", get(api_fps))
        .route("/api/resources", get(api_resources))
        .route("/ws/stats", get(ws_stats))
        .with_state(app_state)
}

async fn root() -> Redirect {
    Redirect::to("/dashboard")
}

async fn video_default(State(state): State<Arc<AppState>>) -> Response {
    stream_response(state, DEFAULT_TOPIC.to_string())
}

async fn video_topic(State(state): State<Arc<AppState>>, Path(topic): Path<String>) -> Response {
    stream_response(state, topic)
}

fn stream_response(state: Arc<AppState>, topic: String) -> Response {
    let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(4);
    tokio::spawn(stream_generator(state.gateway.clone(), topic, tx));

    let body = Body::from_stream(ReceiverStream::new(rx));
    Response::builder()
        .header("Content-Type", "multipart/x-mixed-replace; boundary=frameboundary")
        .body(body)
        .unwrap_or_else(|_| Response::new(Body::empty()))
}

/// Per-request generator: pops the topic's jitter buffer, emits an MJPEG part on a hit, or a
/// throttled "no signal" placeholder once the topic has been silent for
/// [`NO_DATA_TIMEOUT`].
async fn stream_generator(gateway: Arc<SharedState>, topic: String, tx: mpsc::Sender<Result<Bytes, Infallible>>) {
    let mut last_data = tokio::time::Instant::now();
    let tight_poll = gateway.buffer_delay() == 0.0;

    loop {
        let popped = gateway.pop(&topic, wall_clock_secs_f64()).await;
        if let Some(payload) = popped {
            last_data = tokio::time::Instant::now();
            if tx.send(Ok(mjpeg_part(&payload))).await.is_err() {
                return;
            }
            tokio::time::sleep(if tight_poll { Duration::from_millis(1) } else { Duration::from_millis(10) })
                .await;
        } else if last_data.elapsed() > NO_DATA_TIMEOUT {
            let placeholder = gateway.placeholder(&topic).await;
            if tx.send(Ok(mjpeg_part(&placeholder))).await.is_err() {
                return;
            }
            tokio::time::sleep(PLACEHOLDER_THROTTLE).await;
        } else {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

fn mjpeg_part(payload: &Bytes) -> Bytes {
    let mut part = BytesMut::with_capacity(payload.len() + 64);
    part.extend_from_slice(b"--frameboundary\r\nContent-Type: image/jpeg\r\n\r\n");
    part.extend_from_slice(payload);
    part.extend_from_slice(b"\r\n");
    part.freeze()
}

async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({"status": "ok"}))
}

async fn api_status(State(state): State<Arc<AppState>>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::Value::Object(state.gateway.status_snapshot().await))
}

async fn api_fps(State(state): State<Arc<AppState>>) -> axum::Json<serde_json::Value> {
    let snapshot = state.gateway.fps_snapshot(wall_clock_secs_f64()).await;
    axum::Json(serde_json::Value::Object(snapshot))
}

async fn api_resources(State(state): State<Arc<AppState>>) -> axum::Json<serde_json::Value> {
    let buffers = state.gateway.buffer_stats().await;
    let queues = state.gateway.queue_stats().await;
    axum::Json(serde_json::json!({"buffers": buffers, "queues": queues}))
}

async fn ws_stats(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let mut rx = state.stats_tx.subscribe();
    loop {
        tokio::select! {
            received = rx.recv() => {
                let Ok(payload) = received else { break };
                if socket.send(Message::Text(payload.to_string())).await.is_err() {
                    break;
                }
            }
            incoming = socket.recv() => {
                // Clients send nothing meaningful; only used to detect disconnects.
                if incoming.is_none() {
                    break;
                }
            }
        }
    }
}

/// Background task: every [`STATS_BROADCAST_INTERVAL`], compute `{fps, buffers, queues,
/// status}` and publish it. `send` is a no-op if no client is currently subscribed.
async fn broadcast_stats(gateway: Arc<SharedState>, tx: broadcast::Sender<Arc<str>>) {
    let mut ticker = tokio::time::interval(STATS_BROADCAST_INTERVAL);
    loop {
        ticker.tick().await;
        let now = wall_clock_secs_f64();
        let snapshot = serde_json::json!({
            "fps": gateway.fps_snapshot(now).await,
            "buffers": gateway.buffer_stats().await,
            "queues": gateway.queue_stats().await,
            "status": gateway.status_snapshot().await,
        });
        let _ = tx.send(Arc::from(snapshot.to_string()));
    }
}

async fn dashboard(State(state): State<Arc<AppState>>) -> axum::response::Html<String> {
    let topics = state.gateway.known_topics().await;
    axum::response::Html(render_dashboard(&topics))
}

/// Render the static dashboard page: an `<img>` tile per known topic pointed at its
/// `/video/{topic}` stream, plus an inline script rendering `/ws/stats` snapshots into a table.
fn render_dashboard(topics: &[String]) -> String {
    let tiles: String = if topics.is_empty() {
        "<p>No topics yet. Start a producer to see a feed here.</p>".to_string()
    } else {
        topics
            .iter()
            .map(|topic| {
                format!(
                    "<figure><img src=\"/video/{topic}\" alt=\"{topic}\"><figcaption>{topic}</figcaption></figure>"
                )
            })
            .collect()
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>edgeflow gateway</title></head>
<body>
<h1>edgeflow gateway</h1>
<section id="tiles">{tiles}</section>
<table id="stats"></table>
<script>
const ws = new WebSocket(`ws://${{location.host}}/ws/stats`);
ws.onmessage = (event) => {{
  const data = JSON.parse(event.data);
  const table = document.getElementById("stats");
  table.innerHTML = "<tr><th>topic</th><th>fps</th><th>buffer</th><th>queue</th></tr>" +
    Object.keys(data.status || {{}}).map((topic) => {{
      const fps = (data.fps && data.fps[topic] && data.fps[topic].total) || 0;
      const buf = data.buffers && data.buffers[topic];
      const q = data.queues && data.queues[topic];
      const bufText = buf ? `${{buf.current}}/${{buf.max}}` : "-";
      const qText = q ? `${{q.current}}/${{q.max}}` : "-";
      return `<tr><td>${{topic}}</td><td>${{fps}}</td><td>${{bufText}}</td><td>${{qText}}</td></tr>`;
    }}).join("")
}};
</script>
</body>
</html>"#
    )
}

fn wall_clock_secs_f64() -> f64 {
    #[allow(clippy::disallowed_methods)]
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_renders_a_tile_per_topic() {
        let html = render_dashboard(&["cam".to_string(), "yolo".to_string()]);
        assert!(html.contains("/video/cam"));
        assert!(html.contains("/video/yolo"));
    }

    #[test]
    fn dashboard_handles_no_topics() {
        let html = render_dashboard(&[]);
        assert!(html.contains("No topics yet"));
    }

    #[test]
    fn mjpeg_part_has_boundary_and_content_type() {
        let part = mjpeg_part(&Bytes::from_static(b"jpegdata"));
        assert!(part.starts_with(b"--frameboundary\r\n"));
        assert!(part.ends_with(b"jpegdata\r\n"));
    }
}
