//! FPS accounting: a sliding one-second window of arrival timestamps per topic (and per
//! worker id within a topic), grounded in `WebInterface._calculate_fps` in
//! `examples/original_source/edgeflow/nodes/gateway/interfaces/web.py`.

use std::collections::{BTreeMap, VecDeque};

/// Width of the moving window used to estimate frames-per-second.
const FPS_WINDOW_SECS: f64 = 1.0;

/// Per-topic FPS snapshot: the topic's aggregate rate plus a breakdown by `worker_id` for
/// topics fed by multiple replica producers.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct TopicFps {
    /// Frames observed on this topic in the last second.
    pub total: f64,
    /// Frames observed in the last second, broken down by `meta["worker_id"]`.
    pub workers: BTreeMap<String, f64>,
}

/// Tracks frame arrival timestamps per topic (and per worker within a topic) and reduces them
/// to a windowed FPS estimate on demand.
#[derive(Default)]
pub struct FpsTracker {
    topic_arrivals: BTreeMap<String, VecDeque<f64>>,
    worker_arrivals: BTreeMap<String, BTreeMap<String, VecDeque<f64>>>,
}

impl FpsTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame's arrival at wall-clock time `now` on `topic`, optionally tagged with a
    /// `worker_id`.
    pub fn record(&mut self, topic: &str, worker_id: Option<&str>, now: f64) {
        self.topic_arrivals.entry(topic.to_string()).or_default().push_back(now);
        if let Some(worker_id) = worker_id {
            self.worker_arrivals
                .entry(topic.to_string())
                .or_default()
                .entry(worker_id.to_string())
                .or_default()
                .push_back(now);
        }
    }

    /// Trim every tracked deque to the last [`FPS_WINDOW_SECS`] and return a snapshot of
    /// per-topic FPS (and per-worker breakdowns) as of `now`.
    pub fn snapshot(&mut self, now: f64) -> BTreeMap<String, TopicFps> {
        let cutoff = now - FPS_WINDOW_SECS;
        let mut result = BTreeMap::new();

        for (topic, arrivals) in &mut self.topic_arrivals {
            trim(arrivals, cutoff);
            result.entry(topic.clone()).or_insert_with(TopicFps::default).total =
                round2(arrivals.len() as f64);
        }

        for (topic, workers) in &mut self.worker_arrivals {
            let entry = result.entry(topic.clone()).or_insert_with(TopicFps::default);
            for (worker_id, arrivals) in workers {
                trim(arrivals, cutoff);
                entry.workers.insert(worker_id.clone(), round2(arrivals.len() as f64));
            }
        }

        result
    }
}

fn trim(deque: &mut VecDeque<f64>, cutoff: f64) {
    while deque.front().is_some_and(|&ts| ts < cutoff) {
        deque.pop_front();
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_arrivals_within_window() {
        let mut tracker = FpsTracker::new();
        for i in 0..5 {
            tracker.record("cam", None, 10.0 + f64::from(i) * 0.1);
        }
        let snapshot = tracker.snapshot(10.4);
        assert_eq!(snapshot["cam"].total, 5.0);
    }

    #[test]
    fn drops_arrivals_older_than_one_second() {
        let mut tracker = FpsTracker::new();
        tracker.record("cam", None, 0.0);
        tracker.record("cam", None, 2.0);
        let snapshot = tracker.snapshot(2.1);
        assert_eq!(snapshot["cam"].total, 1.0);
    }

    #[test]
    fn tracks_worker_breakdown() {
        let mut tracker = FpsTracker::new();
        tracker.record("cam", Some("w1"), 1.0);
        tracker.record("cam", Some("w2"), 1.0);
        tracker.record("cam", Some("w1"), 1.1);
        let snapshot = tracker.snapshot(1.2);
        assert_eq!(snapshot["cam"].total, 3.0);
        assert_eq!(snapshot["cam"].workers["w1"], 2.0);
        assert_eq!(snapshot["cam"].workers["w2"], 1.0);
    }
}
