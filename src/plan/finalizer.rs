// src/plan/finalizer.rs

//! Finalizer groups.
//!
//! A finalizer group is created for a finalizer task the first time it is
//! discovered through a finalizer edge. It collects every node that is only
//! in the plan because of that finalizer and remembers the strongest ordinal
//! seen on any path leading into it.

use std::collections::HashSet;

use tracing::trace;

use crate::plan::group::OrdinalGroup;
use crate::types::NodeId;

/// Handle of a finalizer group in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FinalizerGroupId(usize);

impl FinalizerGroupId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct FinalizerGroup {
    /// The finalizer task that triggered this group.
    node: NodeId,
    ordinal: Option<OrdinalGroup>,
    /// Insertion-ordered members; `member_set` mirrors it for lookups.
    members: Vec<NodeId>,
    member_set: HashSet<NodeId>,
}

impl FinalizerGroup {
    /// Create a group for `node`, seeded with the ordinal of the group that
    /// led to its discovery.
    pub fn new(node: NodeId, from_ordinal: Option<OrdinalGroup>) -> Self {
        let mut group = Self {
            node,
            ordinal: from_ordinal,
            members: Vec::new(),
            member_set: HashSet::new(),
        };
        group.add_member(node);
        group
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn ordinal(&self) -> Option<OrdinalGroup> {
        self.ordinal
    }

    /// Adopt `ordinal` if it is stronger than the current one.
    ///
    /// Returns `true` if the inherited ordinal changed. The ordinal only ever
    /// moves upwards.
    pub fn maybe_inherit_ordinal(&mut self, ordinal: Option<OrdinalGroup>) -> bool {
        let Some(candidate) = ordinal else {
            return false;
        };
        match self.ordinal {
            Some(current) if current.ordinal() >= candidate.ordinal() => false,
            _ => {
                trace!(
                    finalizer = %self.node,
                    from = ?self.ordinal.map(OrdinalGroup::ordinal),
                    to = candidate.ordinal(),
                    "finalizer group inherits ordinal"
                );
                self.ordinal = Some(candidate);
                true
            }
        }
    }

    pub fn add_member(&mut self, node: NodeId) {
        if self.member_set.insert(node) {
            self.members.push(node);
        }
    }

    pub fn remove_member(&mut self, node: NodeId) {
        if self.member_set.remove(&node) {
            self.members.retain(|member| *member != node);
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.member_set.contains(&node)
    }

    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    pub fn visit_all_members(&self, mut visitor: impl FnMut(NodeId)) {
        for member in &self.members {
            visitor(*member);
        }
    }
}
