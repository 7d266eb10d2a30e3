//! In-process broker, grounded in the teacher's `Arc<Mutex<..>>` storage convention.
//!
//! Used by tests, the harness, and single-binary demos that want pipeline semantics without a
//! Redis dependency. One `VecDeque<Bytes>` per topic plays both planes at once: there is no
//! separate payload store to expire, so [`Broker::pop`] and [`Broker::pop_latest`] differ only in
//! which end of the deque they read from.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::Mutex,
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::time::Instant;

use super::{Broker, BrokerConfig, QueueStat};

struct TopicQueue {
    frames: VecDeque<Bytes>,
    capacity: usize,
}

#[derive(Default)]
struct Inner {
    topics: BTreeMap<String, TopicQueue>,
}

impl Inner {
    fn queue_mut(&mut self, topic: &str) -> &mut TopicQueue {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| TopicQueue { frames: VecDeque::new(), capacity: usize::MAX })
    }
}

/// Broker backed by an in-process mutex-guarded map, one queue per topic.
pub struct InMemoryBroker {
    inner: Mutex<Inner>,
    notify: tokio::sync::Notify,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    /// Create an empty broker with no topics configured.
    #[must_use]
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()), notify: tokio::sync::Notify::new() }
    }

    #[allow(clippy::disallowed_methods)]
    fn poll<T>(&self, mut f: impl FnMut(&mut Inner) -> Option<T>) -> Option<T> {
        let mut guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&mut guard)
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn push(&self, topic: &str, frame_bytes: Bytes) {
        {
            #[allow(clippy::disallowed_methods)]
            let mut guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            let queue = guard.queue_mut(topic);
            queue.frames.push_back(frame_bytes);
            while queue.frames.len() > queue.capacity {
                queue.frames.pop_front();
            }
        }
        self.notify.notify_waiters();
    }

    async fn pop(&self, topic: &str, timeout: Duration) -> Option<Bytes> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(frame) = self.poll(|inner| inner.queue_mut(topic).frames.pop_front()) {
                return Some(frame);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let _ = tokio::time::timeout(remaining, self.notify.notified()).await;
        }
    }

    async fn pop_latest(&self, topic: &str, timeout: Duration) -> Option<Bytes> {
        let deadline = Instant::now() + timeout;
        loop {
            let popped = self.poll(|inner| {
                let queue = inner.queue_mut(topic);
                let latest = queue.frames.pop_back();
                queue.frames.clear();
                latest
            });
            if let Some(frame) = popped {
                return Some(frame);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            let _ = tokio::time::timeout(remaining, self.notify.notified()).await;
        }
    }

    async fn trim(&self, topic: &str, size: usize) {
        self.poll::<()>(|inner| {
            let queue = inner.queue_mut(topic);
            queue.capacity = size;
            while queue.frames.len() > size {
                queue.frames.pop_front();
            }
            None
        });
    }

    async fn queue_size(&self, topic: &str) -> usize {
        self.poll(|inner| Some(inner.queue_mut(topic).frames.len())).unwrap_or(0)
    }

    async fn queue_stats(&self) -> BTreeMap<String, QueueStat> {
        #[allow(clippy::disallowed_methods)]
        let guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard
            .topics
            .iter()
            .map(|(topic, queue)| {
                (topic.clone(), QueueStat { current: queue.frames.len(), max: queue.capacity })
            })
            .collect()
    }

    async fn reset(&self) {
        #[allow(clippy::disallowed_methods)]
        let mut guard = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        guard.topics.clear();
    }

    fn to_config(&self) -> BrokerConfig {
        BrokerConfig::InMemory
    }
}
