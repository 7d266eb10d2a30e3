//! A stand-in detector consumer: no YOLO weights ship with this demo, so `process()` reports a
//! deterministic pseudo-detection count derived from the payload instead of running inference.
//! The point of this node is to exercise the consumer lifecycle (pop, transform, forward with
//! fresh metadata) end to end, not to detect anything real.

use bytes::Bytes;
use edgeflow_node::ConsumerNode;
use edgeflow_proto::MetaMap;

/// Forwards the input payload unchanged, tagging it with a `detections` count.
pub struct DetectorNode;

impl ConsumerNode for DetectorNode {
    fn process(&mut self, payload: &Bytes) -> Result<Option<(Vec<u8>, MetaMap)>, String> {
        let detections = i64::from(payload.first().copied().unwrap_or(0) % 4);

        let mut meta = MetaMap::new();
        meta.insert("detections".to_string(), detections.into());

        Ok(Some((payload.to_vec(), meta)))
    }
}
