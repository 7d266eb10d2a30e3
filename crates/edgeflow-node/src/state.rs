//! Node health, tracked so a failed `setup()` degrades a node to a visible error stream instead
//! of exiting silently (`SPEC_FULL.md` §4.4).

/// Whether a node's driver is running user code or substituting an error frame every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeState {
    /// `setup()` succeeded (or was never overridden); the driver calls user code each cycle.
    Healthy,
    /// `setup()` raised; the driver permanently emits a setup-error frame instead.
    SetupFailed(String),
}
