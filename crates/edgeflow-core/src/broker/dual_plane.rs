//! Redis-backed dual-plane broker: a lightweight control-plane list of frame ids, and a
//! data-plane blob store for the actual payloads.
//!
//! Grounded in the teacher's Redis usage conventions plus the original `DualRedisListBroker`
//! (`comms/brokers/dual_redis_list.py`): `RPUSH`/`LTRIM`/`BLPOP` on the control connection for
//! ordering, `SET ... EX 60`/`GET` on the data connection for payloads. Connection failures never
//! propagate to the caller (`SPEC_FULL.md` §7) — every Redis error is logged once and the
//! connection is torn down so the next call reconnects from scratch.

use std::{
    collections::BTreeMap,
    sync::Mutex as StdMutex,
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use redis::{AsyncCommands, Client};
use tokio::sync::Mutex;

use super::{Broker, BrokerConfig, QueueStat};
use crate::env::Environment;

const META_LIMIT_PREFIX: &str = "edgeflow:meta:limit:";
const DATA_TTL_SECS: u64 = 60;
const DEFAULT_MAXLEN: usize = 100;

/// Redis-backed broker spanning a control-plane connection (ordering) and a data-plane
/// connection (payload blobs), which may be the same Redis instance.
pub struct DualPlaneBroker<E: Environment> {
    ctrl_host: String,
    ctrl_port: u16,
    data_host: String,
    data_port: u16,
    env: E,
    ctrl: Mutex<Option<redis::aio::ConnectionManager>>,
    data: Mutex<Option<redis::aio::ConnectionManager>>,
    data_is_ctrl: StdMutex<bool>,
    topic_limits: StdMutex<BTreeMap<String, usize>>,
}

impl<E: Environment> DualPlaneBroker<E> {
    /// Build a broker targeting the given control/data Redis endpoints. Connections are made
    /// lazily on first use, matching the original's `_ensure_connected` pattern.
    #[must_use]
    pub fn new(ctrl_host: String, ctrl_port: u16, data_host: String, data_port: u16, env: E) -> Self {
        Self {
            ctrl_host,
            ctrl_port,
            data_host,
            data_port,
            env,
            ctrl: Mutex::new(None),
            data: Mutex::new(None),
            data_is_ctrl: StdMutex::new(false),
            topic_limits: StdMutex::new(BTreeMap::new()),
        }
    }

    async fn connect_with_backoff(&self, host: &str, port: u16, label: &str) -> redis::aio::ConnectionManager {
        let mut wait = Duration::from_secs(1);
        loop {
            match Self::try_connect(host, port).await {
                Ok(manager) => {
                    tracing::info!(host, port, label, "redis connected");
                    return manager;
                }
                Err(err) => {
                    tracing::warn!(host, port, label, %err, wait_secs = wait.as_secs(), "redis connect failed, retrying");
                    self.env.sleep(wait).await;
                    wait = (wait * 2).min(Duration::from_secs(30));
                }
            }
        }
    }

    async fn try_connect(host: &str, port: u16) -> redis::RedisResult<redis::aio::ConnectionManager> {
        let client = Client::open(format!("redis://{host}:{port}"))?;
        let mut manager = client.get_connection_manager().await?;
        redis::cmd("PING").query_async::<String>(&mut manager).await?;
        Ok(manager)
    }

    async fn ensure_ctrl(&self) -> redis::aio::ConnectionManager {
        let mut guard = self.ctrl.lock().await;
        if let Some(manager) = guard.as_mut() {
            if redis::cmd("PING").query_async::<String>(manager).await.is_ok() {
                return manager.clone();
            }
            tracing::warn!("control redis connection lost, reconnecting");
        }
        let manager = self.connect_with_backoff(&self.ctrl_host, self.ctrl_port, "control").await;
        *guard = Some(manager.clone());
        manager
    }

    async fn ensure_data(&self) -> redis::aio::ConnectionManager {
        let mut guard = self.data.lock().await;
        if let Some(manager) = guard.as_mut() {
            if redis::cmd("PING").query_async::<String>(manager).await.is_ok() {
                return manager.clone();
            }
            tracing::warn!("data redis connection lost, reconnecting");
        }

        let is_loopback = matches!(self.data_host.as_str(), "localhost" | "127.0.0.1");
        let manager = if is_loopback {
            match Self::try_connect(&self.data_host, self.data_port).await {
                Ok(manager) => {
                    tracing::info!(host = %self.data_host, port = self.data_port, "data redis connected");
                    manager
                }
                Err(err) => {
                    tracing::warn!(
                        %err,
                        host = %self.data_host,
                        port = self.data_port,
                        "data redis unreachable on loopback, falling back to control connection"
                    );
                    *self.data_is_ctrl.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = true;
                    drop(guard);
                    return self.ensure_ctrl().await;
                }
            }
        } else {
            self.connect_with_backoff(&self.data_host, self.data_port, "data").await
        };

        *guard = Some(manager.clone());
        manager
    }

    fn cached_limit(&self, topic: &str) -> Option<usize> {
        self.topic_limits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(topic)
            .copied()
    }

    fn cache_limit(&self, topic: &str, limit: usize) {
        self.topic_limits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(topic.to_string(), limit);
    }

    async fn resolve_limit(&self, topic: &str, ctrl: &mut redis::aio::ConnectionManager) -> usize {
        if let Some(limit) = self.cached_limit(topic) {
            return limit;
        }
        let key = format!("{META_LIMIT_PREFIX}{topic}");
        let fetched: Option<usize> = ctrl.get(&key).await.unwrap_or(None);
        let limit = fetched.unwrap_or(DEFAULT_MAXLEN);
        self.cache_limit(topic, limit);
        limit
    }

    async fn fetch_by_id(&self, topic: &str, frame_id: &str) -> Option<Bytes> {
        let mut data = self.ensure_data().await;
        let key = format!("{topic}:data:{frame_id}");
        match data.get::<_, Option<Vec<u8>>>(&key).await {
            Ok(Some(bytes)) => Some(Bytes::from(bytes)),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(%err, topic, "redis get failed");
                *self.data.lock().await = None;
                None
            }
        }
    }

    async fn blocking_pop_id(&self, topic: &str, timeout: Duration) -> Option<String> {
        let mut ctrl = self.ensure_ctrl().await;
        let result: redis::RedisResult<Option<(String, String)>> =
            ctrl.blpop(topic, timeout.as_secs_f64()).await;
        match result {
            Ok(Some((_, frame_id))) => Some(frame_id),
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(%err, topic, "redis blpop failed");
                *self.ctrl.lock().await = None;
                None
            }
        }
    }
}

#[async_trait]
impl<E: Environment> Broker for DualPlaneBroker<E> {
    async fn push(&self, topic: &str, frame_bytes: Bytes) {
        if frame_bytes.len() < 4 {
            return;
        }
        let Ok(frame_id) = edgeflow_proto::Frame::peek_id(&frame_bytes) else {
            tracing::warn!(topic, "dropping frame with unreadable id");
            return;
        };

        let mut ctrl = self.ensure_ctrl().await;
        let limit = self.resolve_limit(topic, &mut ctrl).await;
        let data_key = format!("{topic}:data:{frame_id}");

        let same_instance = *self.data_is_ctrl.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut data = if same_instance { ctrl.clone() } else { self.ensure_data().await };

        let set_result: redis::RedisResult<()> =
            data.set_ex(&data_key, frame_bytes.to_vec(), DATA_TTL_SECS).await;
        if let Err(err) = set_result {
            tracing::warn!(%err, topic, "redis set failed");
            *self.data.lock().await = None;
            return;
        }

        let push_result: redis::RedisResult<()> = async {
            let () = ctrl.rpush(topic, frame_id.to_string()).await?;
            let () = ctrl.ltrim(topic, -(limit as isize), -1).await?;
            Ok(())
        }
        .await;
        if let Err(err) = push_result {
            tracing::warn!(%err, topic, "redis rpush/ltrim failed");
            *self.ctrl.lock().await = None;
        }
    }

    async fn pop(&self, topic: &str, timeout: Duration) -> Option<Bytes> {
        let frame_id = self.blocking_pop_id(topic, timeout).await?;
        self.fetch_by_id(topic, &frame_id).await
    }

    async fn pop_latest(&self, topic: &str, timeout: Duration) -> Option<Bytes> {
        // With REALTIME's capacity-1 list this coincides with `pop`; the control plane already
        // guarantees at most one id is ever queued.
        let frame_id = self.blocking_pop_id(topic, timeout).await?;
        self.fetch_by_id(topic, &frame_id).await
    }

    async fn trim(&self, topic: &str, size: usize) {
        self.cache_limit(topic, size);
        let mut ctrl = self.ensure_ctrl().await;
        let key = format!("{META_LIMIT_PREFIX}{topic}");
        let result: redis::RedisResult<()> = async {
            let () = ctrl.set(&key, size).await?;
            let () = ctrl.ltrim(topic, -(size as isize), -1).await?;
            Ok(())
        }
        .await;
        if let Err(err) = result {
            tracing::warn!(%err, topic, "redis trim failed");
        }
    }

    async fn queue_size(&self, topic: &str) -> usize {
        let mut ctrl = self.ensure_ctrl().await;
        ctrl.llen(topic).await.unwrap_or(0)
    }

    async fn queue_stats(&self) -> BTreeMap<String, QueueStat> {
        let mut ctrl = self.ensure_ctrl().await;
        let mut stats = BTreeMap::new();

        let keys: Vec<String> = match ctrl.keys(format!("{META_LIMIT_PREFIX}*")).await {
            Ok(keys) => keys,
            Err(err) => {
                tracing::warn!(%err, "redis keys scan failed");
                return stats;
            }
        };

        for key in keys {
            let Some(topic) = key.strip_prefix(META_LIMIT_PREFIX) else { continue };
            let max: usize = ctrl.get(&key).await.unwrap_or(DEFAULT_MAXLEN);
            let current: usize = ctrl.llen(topic).await.unwrap_or(0);
            stats.insert(topic.to_string(), QueueStat { current, max });
        }
        stats
    }

    async fn reset(&self) {
        let mut ctrl = self.ensure_ctrl().await;
        if let Err(err) = redis::cmd("FLUSHALL").query_async::<()>(&mut ctrl).await {
            tracing::warn!(%err, "control redis flushall failed");
        }

        let same_instance = *self.data_is_ctrl.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        if !same_instance {
            let mut data = self.ensure_data().await;
            if let Err(err) = redis::cmd("FLUSHALL").query_async::<()>(&mut data).await {
                tracing::warn!(%err, "data redis flushall failed");
            }
        }
    }

    fn to_config(&self) -> BrokerConfig {
        BrokerConfig::DualPlane {
            ctrl_host: self.ctrl_host.clone(),
            ctrl_port: self.ctrl_port,
            data_host: self.data_host.clone(),
            data_port: self.data_port,
        }
    }
}
