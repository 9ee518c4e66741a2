// src/plan/node.rs

//! Arena entry shared by task nodes and ordinal nodes.

use std::collections::BTreeSet;
use std::fmt;

use crate::plan::group::NodeGroup;
use crate::plan::ordinal::OrdinalNode;
use crate::plan::task_node::TaskNode;
use crate::types::{ExecutionState, NodeFailure, NodeId};

#[derive(Debug, Clone)]
pub enum NodeKind {
    Task(TaskNode),
    Ordinal(OrdinalNode),
}

/// One schedulable node.
///
/// `dependency_successors` are the intrinsic hard dependencies ("depends
/// on"); the graph mirrors them into `dependency_predecessors` of the target.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    pub(crate) state: ExecutionState,
    pub(crate) failure: Option<NodeFailure>,
    pub(crate) group: NodeGroup,
    pub(crate) dependency_successors: BTreeSet<NodeId>,
    pub(crate) dependency_predecessors: BTreeSet<NodeId>,
    pub(crate) kind: NodeKind,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            state: ExecutionState::NotRequired,
            failure: None,
            group: NodeGroup::Default,
            dependency_successors: BTreeSet::new(),
            dependency_predecessors: BTreeSet::new(),
            kind,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn failure(&self) -> Option<&NodeFailure> {
        self.failure.as_ref()
    }

    pub fn group(&self) -> NodeGroup {
        self.group
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn as_task(&self) -> Option<&TaskNode> {
        match &self.kind {
            NodeKind::Task(task) => Some(task),
            NodeKind::Ordinal(_) => None,
        }
    }

    pub(crate) fn as_task_mut(&mut self) -> Option<&mut TaskNode> {
        match &mut self.kind {
            NodeKind::Task(task) => Some(task),
            NodeKind::Ordinal(_) => None,
        }
    }

    pub fn as_ordinal(&self) -> Option<&OrdinalNode> {
        match &self.kind {
            NodeKind::Ordinal(ordinal) => Some(ordinal),
            NodeKind::Task(_) => None,
        }
    }

    pub fn is_ordinal(&self) -> bool {
        matches!(self.kind, NodeKind::Ordinal(_))
    }

    pub fn dependency_successors(&self) -> &BTreeSet<NodeId> {
        &self.dependency_successors
    }

    pub fn dependency_predecessors(&self) -> &BTreeSet<NodeId> {
        &self.dependency_predecessors
    }

    pub fn is_required(&self) -> bool {
        self.state.is_required()
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }

    pub fn is_executed(&self) -> bool {
        self.state.is_executed()
    }

    pub fn is_successful(&self) -> bool {
        self.state.is_successful()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            NodeKind::Task(task) => f.write_str(task.name()),
            NodeKind::Ordinal(ordinal) => write!(f, "{ordinal}"),
        }
    }
}
