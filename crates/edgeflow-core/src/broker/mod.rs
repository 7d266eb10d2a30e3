//! Broker interface: topic-addressed push/pop with per-topic bounded capacity.
//!
//! See `SPEC_FULL.md` §4.2. Two implementations exist: [`memory::InMemoryBroker`] for tests and
//! simulation (mirrors the teacher's `MemoryStorage` convention) and
//! [`dual_plane::DualPlaneBroker`] for production, backed by two Redis endpoints (possibly the
//! same instance).

mod config;
mod dual_plane;
mod memory;

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;

pub use config::BrokerConfig;
pub use dual_plane::DualPlaneBroker;
pub use memory::InMemoryBroker;

/// Snapshot of a single topic's queue occupancy, used by the gateway dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct QueueStat {
    /// Number of ids currently enqueued on the control plane for this topic.
    pub current: usize,
    /// Capacity configured via [`Broker::trim`].
    pub max: usize,
}

/// Topic-addressed push/pop broker with per-topic bounded capacity and QoS-aware retrieval.
///
/// No method returns a `Result` to the caller: infrastructure failures are recovered locally
/// (reconnect with backoff, drop the offending operation, log once) per `SPEC_FULL.md` §7 — "no
/// exception propagates out of the broker to the node's `loop()`".
#[async_trait]
pub trait Broker: Send + Sync {
    /// Publish `frame_bytes` (already wire-encoded) to `topic`.
    ///
    /// Non-blocking from the caller's perspective beyond a single round-trip; on a transport
    /// error, logs once at `warn` and returns without publishing.
    async fn push(&self, topic: &str, frame_bytes: Bytes);

    /// Blocking FIFO pop for DURABLE consumers. Returns `None` on timeout or on a dropped
    /// payload (data-plane TTL expiry or eviction race).
    async fn pop(&self, topic: &str, timeout: Duration) -> Option<Bytes>;

    /// Blocking pop returning the most recent frame, for REALTIME consumers. With capacity 1
    /// (the REALTIME default) this coincides with [`Broker::pop`].
    async fn pop_latest(&self, topic: &str, timeout: Duration) -> Option<Bytes>;

    /// Set `topic`'s capacity, persisted so late joiners observe the same limit.
    async fn trim(&self, topic: &str, size: usize);

    /// Current control-plane queue length for `topic`.
    async fn queue_size(&self, topic: &str) -> usize;

    /// Introspection snapshot of every topic this broker has seen a capacity set for.
    async fn queue_stats(&self) -> BTreeMap<String, QueueStat>;

    /// Clear control-plane state (queues and capacity metadata), not payload data. Called once
    /// at system start by [`crate::broker`] consumers such as the wiring `run()` entry point.
    async fn reset(&self);

    /// Serializable configuration so a freshly spawned worker process can re-establish the same
    /// broker via [`BrokerConfig::connect`].
    fn to_config(&self) -> BrokerConfig;
}

#[cfg(test)]
mod shared_scenarios {
    //! Scenario tests from `SPEC_FULL.md` §8, run against [`InMemoryBroker`]. The dual-plane
    //! broker is covered separately behind `#[ignore]` (it needs a real Redis); these scenarios
    //! exercise the same contract every `Broker` implementation must satisfy.

    use bytes::Bytes;
    use edgeflow_proto::{Frame, MetaMap, MetaValue};

    use super::*;

    fn frame_bytes(id: u32, payload: &[u8]) -> Bytes {
        let mut meta = MetaMap::new();
        meta.insert("topic".into(), MetaValue::Str("cam".into()));
        Frame::new(id, 1.5, meta, payload.to_vec()).to_bytes()
    }

    #[tokio::test]
    async fn roundtrip_scenario() {
        let broker = InMemoryBroker::new();
        broker.trim("cam", 100).await;
        broker.push("cam", frame_bytes(7, b"\xde\xad\xbe\xef")).await;

        let popped = broker.pop("cam", Duration::from_millis(50)).await.expect("should pop");
        let frame = Frame::decode(&popped).expect("should decode");
        assert_eq!(frame.frame_id, 7);
        assert_eq!(frame.payload.as_ref(), b"\xde\xad\xbe\xef");
    }

    #[tokio::test]
    async fn realtime_collapse_scenario() {
        let broker = InMemoryBroker::new();
        broker.trim("cam", 1).await;
        for id in 1..=5u32 {
            broker.push("cam", frame_bytes(id, b"x")).await;
        }

        let popped = broker.pop_latest("cam", Duration::from_millis(50)).await.expect("should pop");
        assert_eq!(Frame::decode(&popped).unwrap().frame_id, 5);

        assert!(broker.pop_latest("cam", Duration::from_millis(20)).await.is_none());
    }

    #[tokio::test]
    async fn durable_order_and_overflow_scenario() {
        let broker = InMemoryBroker::new();
        broker.trim("log", 3).await;
        for id in 1..=10u32 {
            broker.push("log", frame_bytes(id, b"x")).await;
        }

        let mut observed = Vec::new();
        for _ in 0..6 {
            let popped = broker.pop("log", Duration::from_millis(20)).await;
            observed.push(popped.map(|b| Frame::decode(&b).unwrap().frame_id));
        }

        assert_eq!(observed, vec![Some(8), Some(9), Some(10), None, None, None]);
    }

    #[tokio::test]
    async fn queue_size_never_exceeds_capacity() {
        let broker = InMemoryBroker::new();
        broker.trim("cam", 3).await;
        for id in 0..20u32 {
            broker.push("cam", frame_bytes(id, b"x")).await;
            assert!(broker.queue_size("cam").await <= 3);
        }
    }

    #[tokio::test]
    async fn pop_returns_none_on_empty_topic() {
        let broker = InMemoryBroker::new();
        assert!(broker.pop("never-pushed", Duration::from_millis(10)).await.is_none());
    }
}
