// src/plan/ordinal.rs

//! Synthetic barrier nodes, one per `(type, ordinal)` pair.

use std::collections::BTreeMap;
use std::fmt;

use crate::types::{NodeId, OrdinalType};

/// Identity of an ordinal barrier node.
///
/// An ordinal node does no work and never fails; it only aggregates the hard
/// successors of the tasks in one request group so that the opposing type in
/// later groups can depend on a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrdinalNode {
    kind: OrdinalType,
    ordinal: u32,
}

impl OrdinalNode {
    pub fn new(kind: OrdinalType, ordinal: u32) -> Self {
        Self { kind, ordinal }
    }

    pub fn kind(&self) -> OrdinalType {
        self.kind
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }
}

impl fmt::Display for OrdinalNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} locations for task group {}", self.kind, self.ordinal)
    }
}

/// Registry of the ordinal nodes created for a plan.
#[derive(Debug, Default, Clone)]
pub struct OrdinalNodeAccess {
    nodes: BTreeMap<(OrdinalType, u32), NodeId>,
}

impl OrdinalNodeAccess {
    pub fn get(&self, kind: OrdinalType, ordinal: u32) -> Option<NodeId> {
        self.nodes.get(&(kind, ordinal)).copied()
    }

    pub(crate) fn insert(&mut self, kind: OrdinalType, ordinal: u32, node: NodeId) {
        self.nodes.insert((kind, ordinal), node);
    }

    /// Existing nodes of `kind` with an ordinal strictly below `ordinal`, in
    /// ascending ordinal order.
    pub fn preceding(&self, kind: OrdinalType, ordinal: u32) -> Vec<NodeId> {
        self.nodes
            .range((kind, 0)..(kind, ordinal))
            .map(|(_, node)| *node)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_needs_both_type_and_ordinal() {
        let a = OrdinalNode::new(OrdinalType::Destroyer, 0);
        assert_eq!(a, OrdinalNode::new(OrdinalType::Destroyer, 0));
        assert_ne!(a, OrdinalNode::new(OrdinalType::Producer, 0));
        assert_ne!(a, OrdinalNode::new(OrdinalType::Destroyer, 1));
    }

    #[test]
    fn displays_like_a_location_barrier() {
        let node = OrdinalNode::new(OrdinalType::Producer, 3);
        assert_eq!(node.to_string(), "producer locations for task group 3");
    }

    #[test]
    fn preceding_only_returns_lower_ordinals_of_the_same_type() {
        let mut access = OrdinalNodeAccess::default();
        access.insert(OrdinalType::Destroyer, 0, NodeId::from_index(10));
        access.insert(OrdinalType::Destroyer, 2, NodeId::from_index(11));
        access.insert(OrdinalType::Producer, 1, NodeId::from_index(12));
        access.insert(OrdinalType::Destroyer, 3, NodeId::from_index(13));

        assert_eq!(
            access.preceding(OrdinalType::Destroyer, 3),
            vec![NodeId::from_index(10), NodeId::from_index(11)]
        );
        assert!(access.preceding(OrdinalType::Producer, 1).is_empty());
        assert_eq!(access.len(), 4);
    }
}
