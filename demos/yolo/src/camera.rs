//! A synthetic camera producer: no hardware capture is available in this environment, so
//! `produce()` emits an incrementing counter frame at the configured rate instead of an actual
//! JPEG. Downstream nodes only care that a frame arrives at `fps`, not what bytes it carries.

use edgeflow_node::ProducerNode;

/// Produces a small synthetic payload once per driver cycle. Never fails `setup()` or `produce()`
/// — a real capture device's `setup()` is exactly where `SPEC_FULL.md`'s "producer setup failure"
/// scenario would trigger instead.
pub struct CameraNode {
    frame_counter: u64,
}

impl CameraNode {
    /// Build a fresh camera with its counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self { frame_counter: 0 }
    }
}

impl Default for CameraNode {
    fn default() -> Self {
        Self::new()
    }
}

impl ProducerNode for CameraNode {
    fn produce(&mut self) -> Result<Option<Vec<u8>>, String> {
        self.frame_counter = self.frame_counter.wrapping_add(1);
        Ok(Some(self.frame_counter.to_be_bytes().to_vec()))
    }
}
