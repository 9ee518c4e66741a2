// src/plan/group.rs

//! Why a node is part of the plan.
//!
//! Every node belongs to exactly one [`NodeGroup`]. The group decides which
//! extra successors apply to the node and which ordinal it is ordered by.
//! Finalizer groups are shared, mutable objects and therefore live in the
//! graph arena; the variant only stores their id.

use std::fmt;

use crate::plan::finalizer::FinalizerGroupId;

/// Ordinal of a command-line request group (`clean build` gives `clean` 0 and
/// `build` 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrdinalGroup {
    ordinal: u32,
}

impl OrdinalGroup {
    pub fn new(ordinal: u32) -> Self {
        Self { ordinal }
    }

    pub fn ordinal(self) -> u32 {
        self.ordinal
    }
}

impl fmt::Display for OrdinalGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task group {}", self.ordinal)
    }
}

/// Classification of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeGroup {
    /// Shared group for nodes with no particular reason to be ordered.
    #[default]
    Default,
    /// Node reached from a requested task group.
    Ordinal(OrdinalGroup),
    /// Node only reachable through a finalizer.
    Finalizer(FinalizerGroupId),
}

impl NodeGroup {
    pub fn is_entry_point(self) -> bool {
        matches!(self, NodeGroup::Ordinal(_))
    }

    pub fn as_finalizer(self) -> Option<FinalizerGroupId> {
        match self {
            NodeGroup::Finalizer(id) => Some(id),
            NodeGroup::Default | NodeGroup::Ordinal(_) => None,
        }
    }

    /// Ordinal carried directly by this variant.
    ///
    /// Finalizer groups carry an inherited ordinal that can only be read
    /// through the graph; use `ExecutionGraph::as_ordinal` for those.
    pub fn direct_ordinal(self) -> Option<OrdinalGroup> {
        match self {
            NodeGroup::Ordinal(group) => Some(group),
            NodeGroup::Default | NodeGroup::Finalizer(_) => None,
        }
    }
}

impl fmt::Display for NodeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeGroup::Default => f.write_str("default group"),
            NodeGroup::Ordinal(group) => write!(f, "{group}"),
            NodeGroup::Finalizer(id) => write!(f, "finalizer group {}", id.index()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_group_is_neither_ordinal_nor_finalizer() {
        let group = NodeGroup::default();
        assert_eq!(group, NodeGroup::Default);
        assert!(!group.is_entry_point());
        assert!(group.as_finalizer().is_none());
        assert!(group.direct_ordinal().is_none());
    }

    #[test]
    fn ordinal_group_is_an_entry_point() {
        let group = NodeGroup::Ordinal(OrdinalGroup::new(2));
        assert!(group.is_entry_point());
        assert_eq!(group.direct_ordinal().map(OrdinalGroup::ordinal), Some(2));
        assert_eq!(group.to_string(), "task group 2");
    }
}
