// src/plan/task_node.rs

//! Edge sets owned by a real unit of work.

use std::collections::BTreeSet;

use crate::types::NodeId;

/// Payload describing one task as the plan sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSpec {
    pub name: String,
    /// Build the task comes from, if it is not the build being planned.
    pub build: Option<String>,
    /// Task deletes output locations (e.g. `clean`).
    pub destroys: bool,
    /// Task writes output locations.
    pub produces: bool,
}

impl TaskSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            build: None,
            destroys: false,
            produces: false,
        }
    }

    pub fn from_build(mut self, build: impl Into<String>) -> Self {
        self.build = Some(build.into());
        self
    }

    pub fn destroys(mut self, destroys: bool) -> Self {
        self.destroys = destroys;
        self
    }

    pub fn produces(mut self, produces: bool) -> Self {
        self.produces = produces;
        self
    }

    pub fn is_from_other_build(&self) -> bool {
        self.build.is_some()
    }
}

/// Ordering edges of a task node.
///
/// All sets hold arena ids ordered by discovery sequence, which keeps every
/// iteration (and therefore the resulting plan) reproducible. The graph keeps
/// `must_successors`/`must_predecessors` and
/// `finalizing_successors`/`finalizers` in sync.
#[derive(Debug, Clone)]
pub struct TaskNode {
    spec: TaskSpec,
    pub(crate) must_successors: BTreeSet<NodeId>,
    pub(crate) must_predecessors: BTreeSet<NodeId>,
    pub(crate) should_successors: BTreeSet<NodeId>,
    pub(crate) finalizers: BTreeSet<NodeId>,
    pub(crate) finalizing_successors: BTreeSet<NodeId>,
}

impl TaskNode {
    pub fn new(spec: TaskSpec) -> Self {
        Self {
            spec,
            must_successors: BTreeSet::new(),
            must_predecessors: BTreeSet::new(),
            should_successors: BTreeSet::new(),
            finalizers: BTreeSet::new(),
            finalizing_successors: BTreeSet::new(),
        }
    }

    pub fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn must_successors(&self) -> &BTreeSet<NodeId> {
        &self.must_successors
    }

    pub fn must_predecessors(&self) -> &BTreeSet<NodeId> {
        &self.must_predecessors
    }

    pub fn should_successors(&self) -> &BTreeSet<NodeId> {
        &self.should_successors
    }

    /// Tasks that finalize this one.
    pub fn finalizers(&self) -> &BTreeSet<NodeId> {
        &self.finalizers
    }

    /// Tasks this one finalizes.
    pub fn finalizing_successors(&self) -> &BTreeSet<NodeId> {
        &self.finalizing_successors
    }

    pub fn finalizing_successors_in_reverse_order(
        &self,
    ) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.finalizing_successors.iter().rev().copied()
    }
}
