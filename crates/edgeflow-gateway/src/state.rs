//! Shared gateway state: the per-topic jitter buffers, FPS tracker, and latest-metadata map
//! every ingress connection writes into and every HTTP/WS handler reads from.
//!
//! `SPEC_FULL.md` §5 calls for a single mutex guarding `buffers`, `frame_timestamps`, and
//! `latest_meta` together — mirrored here as one [`tokio::sync::Mutex`] wrapping all three,
//! rather than three independently-locked fields that could observe each other torn.

use std::{collections::BTreeMap, sync::Arc};

use bytes::Bytes;
use edgeflow_core::Broker;
use edgeflow_node::errorframe::render_no_signal_frame;
use edgeflow_proto::{Frame, MetaMap, MetaValue};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::{buffer::JitterBuffer, stats::FpsTracker};

/// Topic name used when a frame (or a `/video` request) does not name one explicitly.
pub const DEFAULT_TOPIC: &str = "default";

struct Inner {
    buffers: BTreeMap<String, JitterBuffer>,
    fps: FpsTracker,
    latest_meta: BTreeMap<String, MetaMap>,
    placeholders: BTreeMap<String, Bytes>,
}

/// State shared across the TCP ingress loop, every HTTP handler, and the stats broadcaster.
pub struct SharedState {
    inner: Mutex<Inner>,
    buffer_delay: f64,
    /// Optional broker reference, used only for `/api/resources`' `queues` introspection —
    /// the gateway ingress itself never pushes to or pops from a broker topic.
    broker: Option<Arc<dyn Broker>>,
}

impl SharedState {
    /// Build empty shared state with the given jitter-buffer playback delay and an optional
    /// broker for queue-depth introspection on the dashboard.
    #[must_use]
    pub fn new(buffer_delay: f64, broker: Option<Arc<dyn Broker>>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                buffers: BTreeMap::new(),
                fps: FpsTracker::new(),
                latest_meta: BTreeMap::new(),
                placeholders: BTreeMap::new(),
            }),
            buffer_delay,
            broker,
        }
    }

    /// Route a decoded ingress frame to its topic's jitter buffer, recording FPS and metadata.
    pub async fn on_frame(&self, frame: &Frame, now: f64) {
        let topic = frame.meta.get("topic").and_then(MetaValue::as_str).unwrap_or(DEFAULT_TOPIC);
        let worker_id = frame.meta.get("worker_id").and_then(MetaValue::as_str);

        let mut inner = self.inner.lock().await;
        let is_new_topic = !inner.buffers.contains_key(topic);
        if is_new_topic {
            tracing::info!(topic, "new topic detected on gateway ingress");
        }
        inner
            .buffers
            .entry(topic.to_string())
            .or_insert_with(|| JitterBuffer::new(self.buffer_delay))
            .push(frame.timestamp, frame.payload.clone());

        inner.fps.record(topic, worker_id, now);

        if !frame.meta.is_empty() {
            inner.latest_meta.entry(topic.to_string()).or_default().extend(frame.meta.clone());
        }
    }

    /// Pop the next payload ready for topic, if any.
    pub async fn pop(&self, topic: &str, now: f64) -> Option<Bytes> {
        let mut inner = self.inner.lock().await;
        inner.buffers.get_mut(topic)?.pop(now)
    }

    /// Fetch (rendering and caching on first use) the "no signal" placeholder for `topic`.
    pub async fn placeholder(&self, topic: &str) -> Bytes {
        let mut inner = self.inner.lock().await;
        inner
            .placeholders
            .entry(topic.to_string())
            .or_insert_with(|| render_no_signal_frame(topic))
            .clone()
    }

    /// `{topic: {"current": n, "max": 60}}` for every topic the gateway has ever seen a frame
    /// on, used by `/api/resources` and the WS broadcaster.
    pub async fn buffer_stats(&self) -> Map<String, Value> {
        let inner = self.inner.lock().await;
        inner
            .buffers
            .iter()
            .map(|(topic, buf)| {
                let stat = serde_json::json!({"current": buf.len(), "max": crate::buffer::MAX_SIZE});
                (topic.clone(), stat)
            })
            .collect()
    }

    /// Broker control-plane queue stats, empty if no broker was wired to this gateway.
    pub async fn queue_stats(&self) -> Map<String, Value> {
        let Some(broker) = &self.broker else { return Map::new() };
        broker
            .queue_stats()
            .await
            .into_iter()
            .map(|(topic, stat)| (topic, serde_json::json!({"current": stat.current, "max": stat.max})))
            .collect()
    }

    /// FPS snapshot (total + per-worker breakdown) as of `now`.
    pub async fn fps_snapshot(&self, now: f64) -> Map<String, Value> {
        let mut inner = self.inner.lock().await;
        let snapshot = inner.fps.snapshot(now);
        snapshot
            .into_iter()
            .map(|(topic, fps)| (topic, serde_json::to_value(fps).unwrap_or(Value::Null)))
            .collect()
    }

    /// Latest metadata observed per topic, used by `/api/status` and the dashboard.
    pub async fn status_snapshot(&self) -> Map<String, Value> {
        let inner = self.inner.lock().await;
        inner.latest_meta.iter().map(|(topic, meta)| (topic.clone(), meta_to_json(meta))).collect()
    }

    /// Topic names currently known to the gateway, for the dashboard's list of video tiles.
    pub async fn known_topics(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.buffers.keys().cloned().collect()
    }

    /// Configured jitter-buffer playback delay, used by the stream generator to pick its poll
    /// interval (tight in low-latency mode, relaxed when buffering for reorder).
    #[must_use]
    pub fn buffer_delay(&self) -> f64 {
        self.buffer_delay
    }
}

/// Convert a frame's metadata map to a JSON object for API responses.
fn meta_to_json(meta: &MetaMap) -> Value {
    let object: Map<String, Value> = meta
        .iter()
        .map(|(key, value)| {
            let json_value = match value {
                MetaValue::Str(s) => Value::String(s.clone()),
                MetaValue::Bytes(b) => Value::String(format!("<{} bytes>", b.len())),
                MetaValue::Int(i) => Value::Number((*i).into()),
                MetaValue::Float(f) => {
                    serde_json::Number::from_f64(*f).map_or(Value::Null, Value::Number)
                },
                MetaValue::Bool(b) => Value::Bool(*b),
            };
            (key.clone(), json_value)
        })
        .collect();
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use edgeflow_proto::MetaMap;

    use super::*;

    fn frame(topic: &str, timestamp: f64, payload: &[u8]) -> Frame {
        let mut meta = MetaMap::new();
        meta.insert("topic".into(), MetaValue::Str(topic.into()));
        Frame::new(1, timestamp, meta, payload.to_vec())
    }

    #[tokio::test]
    async fn on_frame_routes_by_topic_and_pop_returns_it() {
        let state = SharedState::new(0.0, None);
        state.on_frame(&frame("a", 1.0, b"x"), 1.0).await;
        state.on_frame(&frame("b", 1.0, b"y"), 1.0).await;

        assert_eq!(state.pop("a", 1.0).await, Some(Bytes::from_static(b"x")));
        assert_eq!(state.pop("b", 1.0).await, Some(Bytes::from_static(b"y")));
    }

    #[tokio::test]
    async fn missing_topic_meta_falls_back_to_default() {
        let state = SharedState::new(0.0, None);
        let frame = Frame::new(1, 1.0, MetaMap::new(), b"z".to_vec());
        state.on_frame(&frame, 1.0).await;

        assert_eq!(state.pop(DEFAULT_TOPIC, 1.0).await, Some(Bytes::from_static(b"z")));
    }

    #[tokio::test]
    async fn buffer_stats_reports_current_and_max() {
        let state = SharedState::new(0.0, None);
        state.on_frame(&frame("a", 1.0, b"x"), 1.0).await;

        let stats = state.buffer_stats().await;
        assert_eq!(stats["a"]["current"], 1);
        assert_eq!(stats["a"]["max"], crate::buffer::MAX_SIZE);
    }

    #[tokio::test]
    async fn placeholder_is_cached_across_calls() {
        let state = SharedState::new(0.0, None);
        let first = state.placeholder("a").await;
        let second = state.placeholder("a").await;
        assert_eq!(first, second);
    }
}
