//! Per-edge delivery preference.

use serde::{Deserialize, Serialize};

/// Delivery preference for a wiring edge.
///
/// `REALTIME` favors freshness (capacity 1, drop-to-latest); `DURABLE` favors ordering
/// (bounded FIFO, default capacity 100). See `SPEC_FULL.md` §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Qos {
    /// Freshness preferred. Target capacity 1; overflow evicts the oldest entry.
    Realtime,
    /// Ordering preferred. Target capacity 100 by default; FIFO, lossy-durable on overflow.
    Durable,
}

impl Qos {
    /// Default topic capacity implied by this QoS when no explicit `queue_size` is wired.
    #[must_use]
    pub const fn default_capacity(self) -> usize {
        match self {
            Self::Realtime => 1,
            Self::Durable => 100,
        }
    }
}
