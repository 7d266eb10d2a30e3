//! A cheap reference to a registered node, returned by [`crate::System::node`].

/// Refers to a node already interned in the process-wide registry. Cloning is just cloning a
/// name — the live spec lives in the registry, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHandle(pub(crate) String);

impl NodeHandle {
    /// The node's registered name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}
