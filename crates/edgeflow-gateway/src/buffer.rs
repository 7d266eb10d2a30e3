//! Per-topic timestamp-ordered reorder buffer.
//!
//! Grounded in `examples/original_source/edgeflow/utils/buffer.py`'s `TimeJitterBuffer`: a
//! bounded min-heap keyed by frame timestamp, with two playback modes (immediate vs. delayed)
//! and opportunistic garbage collection of entries that fell too far behind to ever play.

use std::{cmp::Ordering, collections::BinaryHeap};

use bytes::Bytes;

/// Entries are ordered oldest-timestamp-first so the heap's `peek`/`pop` always surface the
/// earliest frame, matching Python `heapq`'s min-heap semantics (`BinaryHeap` is a max-heap, so
/// ordering is reversed here via [`Ord`]).
struct Entry {
    timestamp: f64,
    payload: Bytes,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed so `BinaryHeap` (a max-heap) pops the smallest timestamp first.
        other.timestamp.total_cmp(&self.timestamp)
    }
}

/// Maximum number of buffered entries per topic. At 30 fps this is roughly two seconds.
pub const MAX_SIZE: usize = 60;

/// How far behind a delayed-playback deadline an entry is allowed to fall before it is dropped
/// without ever being delivered.
const GC_GRACE_SECS: f64 = 0.5;

/// A single topic's jitter buffer.
///
/// With `buffer_delay == 0.0` (low-latency mode), `pop` returns the lowest-timestamp entry
/// immediately. With `buffer_delay > 0.0`, `pop` only returns an entry once wall-clock time has
/// caught up to `entry.timestamp + buffer_delay`, smoothing out arrival jitter at the cost of
/// latency.
pub struct JitterBuffer {
    buffer_delay: f64,
    heap: BinaryHeap<Entry>,
}

impl JitterBuffer {
    /// Build an empty buffer with the given playback delay.
    #[must_use]
    pub fn new(buffer_delay: f64) -> Self {
        Self { buffer_delay, heap: BinaryHeap::new() }
    }

    /// Number of entries currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether the buffer currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Push a new frame payload, evicting the oldest entry first if at capacity.
    pub fn push(&mut self, timestamp: f64, payload: Bytes) {
        while self.heap.len() >= MAX_SIZE {
            self.heap.pop();
        }
        self.heap.push(Entry { timestamp, payload });
    }

    /// Pop the next deliverable entry given the current wall-clock time, or `None` if nothing is
    /// ready (empty buffer, or the oldest entry has not reached its playback deadline yet).
    pub fn pop(&mut self, now: f64) -> Option<Bytes> {
        if self.buffer_delay == 0.0 {
            return self.heap.pop().map(|entry| entry.payload);
        }

        let play_deadline = now - self.buffer_delay;
        let gc_deadline = play_deadline - GC_GRACE_SECS;
        while self.heap.peek().is_some_and(|entry| entry.timestamp < gc_deadline) {
            self.heap.pop();
        }

        let oldest_is_due = self.heap.peek().is_some_and(|entry| entry.timestamp <= play_deadline);
        if oldest_is_due { self.heap.pop().map(|entry| entry.payload) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn immediate_mode_pops_lowest_timestamp_first() {
        let mut buf = JitterBuffer::new(0.0);
        buf.push(3.0, Bytes::from_static(b"c"));
        buf.push(1.0, Bytes::from_static(b"a"));
        buf.push(2.0, Bytes::from_static(b"b"));

        assert_eq!(buf.pop(0.0), Some(Bytes::from_static(b"a")));
        assert_eq!(buf.pop(0.0), Some(Bytes::from_static(b"b")));
        assert_eq!(buf.pop(0.0), Some(Bytes::from_static(b"c")));
        assert_eq!(buf.pop(0.0), None);
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut buf = JitterBuffer::new(0.0);
        for i in 0..(MAX_SIZE + 5) {
            buf.push(i as f64, Bytes::from(vec![i as u8]));
        }
        assert_eq!(buf.len(), MAX_SIZE);
        // The five oldest (timestamps 0..5) should have been evicted.
        let popped = buf.pop(0.0).expect("should have an entry");
        assert_eq!(popped, Bytes::from(vec![5u8]));
    }

    #[test]
    fn delayed_mode_withholds_until_deadline() {
        let mut buf = JitterBuffer::new(1.0);
        buf.push(10.0, Bytes::from_static(b"frame"));

        assert_eq!(buf.pop(10.5), None, "deadline is 11.0, not yet reached");
        assert_eq!(buf.pop(11.0), Some(Bytes::from_static(b"frame")));
    }

    #[test]
    fn delayed_mode_gcs_entries_too_far_past_deadline() {
        let mut buf = JitterBuffer::new(1.0);
        buf.push(10.0, Bytes::from_static(b"stale"));
        // now = 12.0 -> play_deadline = 11.0, gc_deadline = 10.5; 10.0 < 10.5 so it is GC'd.
        assert_eq!(buf.pop(12.0), None);
        assert!(buf.is_empty());
    }
}
