// src/plan/graph.rs

//! Arena holding every node of an execution plan.
//!
//! Nodes reference each other through [`NodeId`]s only, so the bidirectional
//! edge pairs (must successors / predecessors, finalizing successors /
//! finalizers, dependency successors / predecessors) are two index-set
//! insertions under one `&mut self` call.
//!
//! Query methods take ids handed out by this graph and panic on foreign ids,
//! the same way slice indexing does. Mutators validate their ids and return
//! [`PlanError`]s instead.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::errors::{PlanError, Result};
use crate::plan::diagnostics::{DiagnosticEvent, DiagnosticSink, LifecycleHook};
use crate::plan::finalizer::{FinalizerGroup, FinalizerGroupId};
use crate::plan::group::{NodeGroup, OrdinalGroup};
use crate::plan::node::{Node, NodeKind};
use crate::plan::ordinal::{OrdinalNode, OrdinalNodeAccess};
use crate::plan::task_node::{TaskNode, TaskSpec};
use crate::types::{ExecutionState, NodeFailure, NodeId, OrdinalType};

static EMPTY: BTreeSet<NodeId> = BTreeSet::new();

#[derive(Debug)]
pub struct ExecutionGraph {
    nodes: Vec<Node>,
    finalizer_groups: Vec<FinalizerGroup>,
    ordinal_nodes: OrdinalNodeAccess,
    sink: Arc<dyn DiagnosticSink>,
}

impl ExecutionGraph {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            nodes: Vec::new(),
            finalizer_groups: Vec::new(),
            ordinal_nodes: OrdinalNodeAccess::default(),
            sink,
        }
    }

    /// Append a task node. New nodes start out `NotRequired` in the default
    /// group.
    pub fn add_task(&mut self, spec: TaskSpec) -> NodeId {
        self.push(NodeKind::Task(TaskNode::new(spec)))
    }

    /// The ordinal node for `(kind, ordinal)`, created on first use.
    pub fn ordinal_node(&mut self, kind: OrdinalType, ordinal: u32) -> NodeId {
        if let Some(existing) = self.ordinal_nodes.get(kind, ordinal) {
            return existing;
        }
        let id = self.push(NodeKind::Ordinal(OrdinalNode::new(kind, ordinal)));
        self.ordinal_nodes.insert(kind, ordinal, id);
        debug!(node = %id, %kind, ordinal, "created ordinal node");
        id
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        self.nodes.push(Node::new(id, kind));
        id
    }

    pub fn ordinal_nodes(&self) -> &OrdinalNodeAccess {
        &self.ordinal_nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All ids in discovery order.
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.nodes.iter().map(Node::id)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id.index()).ok_or(PlanError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .ok_or(PlanError::UnknownNode(id))
    }

    pub fn task(&self, id: NodeId) -> Result<&TaskNode> {
        self.node(id)?.as_task().ok_or(PlanError::NotATask(id))
    }

    fn task_mut(&mut self, id: NodeId) -> Result<&mut TaskNode> {
        self.node_mut(id)?
            .as_task_mut()
            .ok_or(PlanError::NotATask(id))
    }

    fn entry(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn state(&self, id: NodeId) -> ExecutionState {
        self.entry(id).state
    }

    pub fn group(&self, id: NodeId) -> NodeGroup {
        self.entry(id).group
    }

    /// Human-readable name: the task name, or the barrier description for
    /// ordinal nodes.
    pub fn name_of(&self, id: NodeId) -> String {
        self.entry(id).to_string()
    }

    /// Total order used for deterministic traversal: ordinal nodes first,
    /// then discovery order.
    pub fn compare(&self, a: NodeId, b: NodeId) -> Ordering {
        let rank = |id: NodeId| u8::from(!self.entry(id).is_ordinal());
        rank(a).cmp(&rank(b)).then(a.cmp(&b))
    }

    // ---------------------------------------------------------------------
    // Groups
    // ---------------------------------------------------------------------

    pub fn finalizer_group(&self, id: FinalizerGroupId) -> &FinalizerGroup {
        &self.finalizer_groups[id.index()]
    }

    pub fn finalizer_groups(&self) -> &[FinalizerGroup] {
        &self.finalizer_groups
    }

    /// Ordinal backing a classification: none for the default group, the
    /// group itself for ordinal groups, and the inherited ordinal (if any)
    /// for finalizer groups.
    pub fn as_ordinal(&self, group: NodeGroup) -> Option<OrdinalGroup> {
        match group {
            NodeGroup::Default => None,
            NodeGroup::Ordinal(ordinal) => Some(ordinal),
            NodeGroup::Finalizer(id) => self.finalizer_group(id).ordinal(),
        }
    }

    pub fn as_finalizer(&self, group: NodeGroup) -> Option<&FinalizerGroup> {
        group.as_finalizer().map(|id| self.finalizer_group(id))
    }

    /// The nodes finalized by the finalizer that owns `group`.
    pub fn finalized_nodes(&self, group: FinalizerGroupId) -> &BTreeSet<NodeId> {
        self.entry(self.finalizer_group(group).node())
            .as_task()
            .map(|task| &task.finalizing_successors)
            .unwrap_or(&EMPTY)
    }

    /// Successors forced on every member of `group`.
    pub fn group_successors(&self, group: NodeGroup) -> &BTreeSet<NodeId> {
        match group {
            NodeGroup::Default | NodeGroup::Ordinal(_) => &EMPTY,
            NodeGroup::Finalizer(id) => self.finalized_nodes(id),
        }
    }

    pub fn group_successors_in_reverse_order(
        &self,
        group: NodeGroup,
    ) -> impl Iterator<Item = NodeId> + '_ {
        self.group_successors(group).iter().rev().copied()
    }

    /// Move `id` into `group`, keeping finalizer membership in sync.
    pub fn set_group(&mut self, id: NodeId, group: NodeGroup) -> Result<()> {
        let previous = self.node(id)?.group;
        if previous == group {
            return Ok(());
        }
        if let NodeGroup::Finalizer(new_group) = group {
            self.finalizer_groups
                .get_mut(new_group.index())
                .ok_or_else(|| {
                    PlanError::Other(anyhow::anyhow!(
                        "finalizer group {} does not exist",
                        new_group.index()
                    ))
                })?
                .add_member(id);
        }
        if let NodeGroup::Finalizer(old_group) = previous {
            self.finalizer_groups[old_group.index()].remove_member(id);
        }
        self.node_mut(id)?.group = group;
        trace!(node = %id, from = %previous, to = %group, "node changed group");
        Ok(())
    }

    /// Record that `id` was reached through a finalizer edge from `from`.
    ///
    /// A node that already owns a finalizer group only merges the ordinal of
    /// `from`'s group. Any other node, including a member of someone else's
    /// finalizer group, is moved into a fresh finalizer group seeded from it.
    /// Returns `true` if the classification changed.
    pub fn maybe_inherit_group_as_finalizer(&mut self, id: NodeId, from: NodeId) -> Result<bool> {
        self.task(id)?;
        let from_group = self.node(from)?.group;
        let current = self.entry(id).group;
        match current {
            NodeGroup::Finalizer(group) if self.finalizer_group(group).node() == id => {
                Ok(self.maybe_inherit_from(group, from_group))
            }
            NodeGroup::Default | NodeGroup::Ordinal(_) | NodeGroup::Finalizer(_) => {
                let from_ordinal = self.as_ordinal(from_group);
                let group = FinalizerGroupId::from_index(self.finalizer_groups.len());
                self.finalizer_groups
                    .push(FinalizerGroup::new(id, from_ordinal));
                self.set_group(id, NodeGroup::Finalizer(group))?;
                debug!(
                    node = %self.name_of(id),
                    finalized = %self.name_of(from),
                    ordinal = ?from_ordinal.map(OrdinalGroup::ordinal),
                    "node classified as finalizer"
                );
                Ok(true)
            }
        }
    }

    /// Upgrade the inherited ordinal of `group` from `from_group`.
    pub fn maybe_inherit_from(&mut self, group: FinalizerGroupId, from_group: NodeGroup) -> bool {
        let ordinal = self.as_ordinal(from_group);
        self.finalizer_groups[group.index()].maybe_inherit_ordinal(ordinal)
    }

    // ---------------------------------------------------------------------
    // Successor views
    // ---------------------------------------------------------------------

    /// Should successors, group successors, must successors and intrinsic
    /// dependencies, in that order.
    pub fn all_successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let node = self.entry(id);
        let (should, must) = task_edge_sets(node);
        should
            .iter()
            .chain(self.group_successors(node.group))
            .chain(must)
            .chain(&node.dependency_successors)
            .copied()
    }

    /// Successors that gate correctness; should successors are left out.
    pub fn hard_successors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let node = self.entry(id);
        let (_, must) = task_edge_sets(node);
        self.group_successors(node.group)
            .iter()
            .chain(must)
            .chain(&node.dependency_successors)
            .copied()
    }

    pub fn all_successors_in_reverse_order(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let node = self.entry(id);
        let (should, must) = task_edge_sets(node);
        node.dependency_successors
            .iter()
            .rev()
            .chain(must.iter().rev())
            .copied()
            .chain(self.group_successors_in_reverse_order(node.group))
            .chain(should.iter().rev().copied())
    }

    /// Whether `successor` is reachable from `id` through a single hard edge
    /// (dependency, must, or finalizing).
    pub fn has_hard_successor(&self, id: NodeId, successor: NodeId) -> bool {
        let node = self.entry(id);
        if node.dependency_successors.contains(&successor) {
            return true;
        }
        let Some(task) = node.as_task() else {
            return false;
        };
        if self.entry(successor).as_task().is_none() {
            return false;
        }
        task.must_successors.contains(&successor) || task.finalizing_successors.contains(&successor)
    }

    // ---------------------------------------------------------------------
    // Edge mutators (planning phase only)
    // ---------------------------------------------------------------------

    /// `from` depends on `to`.
    pub fn add_dependency_successor(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.node(to)?;
        self.node_mut(from)?.dependency_successors.insert(to);
        self.node_mut(to)?.dependency_predecessors.insert(from);
        Ok(())
    }

    /// `from` must run after `to`.
    pub fn add_must_successor(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.task(from)?;
        self.task(to)?;
        self.report_cross_build_hook(LifecycleHook::MustRunAfter, from, to);
        self.task_mut(from)?.must_successors.insert(to);
        self.task_mut(to)?.must_predecessors.insert(from);
        Ok(())
    }

    /// `finalizer` finalizes `finalized`.
    pub fn add_finalizing_successor(&mut self, finalizer: NodeId, finalized: NodeId) -> Result<()> {
        self.task(finalized)?;
        self.task_mut(finalizer)?
            .finalizing_successors
            .insert(finalized);
        self.task_mut(finalized)?.finalizers.insert(finalizer);
        Ok(())
    }

    /// `from` should run after `to` if nothing prevents it.
    pub fn add_should_successor(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.task(to)?;
        self.task(from)?;
        self.report_cross_build_hook(LifecycleHook::ShouldRunAfter, from, to);
        self.task_mut(from)?.should_successors.insert(to);
        Ok(())
    }

    /// Returns `true` if the edge existed.
    pub fn remove_should_successor(&mut self, from: NodeId, to: NodeId) -> Result<bool> {
        Ok(self.task_mut(from)?.should_successors.remove(&to))
    }

    fn report_cross_build_hook(&self, hook: LifecycleHook, from: NodeId, to: NodeId) {
        let Ok(target) = self.task(to) else {
            return;
        };
        if let Some(build) = &target.spec().build {
            self.sink.report(DiagnosticEvent::CrossBuildLifecycleHook {
                hook,
                from: self.name_of(from),
                to: target.name().to_string(),
                target_build: build.clone(),
            });
        }
    }

    /// Absorb the required hard successors of `task` into `ordinal`.
    pub fn add_dependencies_from(&mut self, ordinal: NodeId, task: NodeId) -> Result<()> {
        if !self.node(ordinal)?.is_ordinal() {
            return Err(PlanError::NotAnOrdinal(ordinal));
        }
        self.task(task)?;
        let executing: Vec<NodeId> = self
            .hard_successors(task)
            .filter(|successor| self.entry(*successor).is_required())
            .collect();
        for successor in executing {
            self.add_dependency_successor(ordinal, successor)?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Completion predicates
    // ---------------------------------------------------------------------

    /// Everything `id` has to wait for is complete.
    ///
    /// Intrinsic dependencies and must successors must be complete, and a
    /// member of a finalizer group also waits for every finalized node.
    pub fn dependencies_complete(&self, id: NodeId) -> bool {
        let node = self.entry(id);
        if !self.all_complete(&node.dependency_successors) {
            return false;
        }
        let Some(task) = node.as_task() else {
            return true;
        };
        if !self.all_complete(&task.must_successors) {
            return false;
        }
        match node.group.as_finalizer() {
            Some(group) => self.all_complete(self.finalized_nodes(group)),
            None => true,
        }
    }

    /// Whether `id` may run now that its dependencies are complete.
    ///
    /// Outside a finalizer group this is plain dependency success. A
    /// finalizer-group member additionally needs at least one finalized node
    /// to have been attempted; whether that attempt succeeded does not
    /// matter.
    pub fn all_dependencies_successful(&self, id: NodeId) -> bool {
        let node = self.entry(id);
        let dependencies_ok = node
            .dependency_successors
            .iter()
            .all(|dependency| self.entry(*dependency).is_successful());
        if !dependencies_ok {
            return false;
        }
        if node.as_task().is_none() {
            return true;
        }
        match node.group.as_finalizer() {
            None => true,
            Some(group) => self
                .finalized_nodes(group)
                .iter()
                .any(|finalized| self.entry(*finalized).is_executed()),
        }
    }

    fn all_complete(&self, nodes: &BTreeSet<NodeId>) -> bool {
        nodes.iter().all(|node| self.entry(*node).is_complete())
    }

    /// Nodes whose readiness may change once `id` completes.
    pub fn visit_all_dependents(&self, id: NodeId, mut visitor: impl FnMut(NodeId)) {
        let node = self.entry(id);
        for predecessor in &node.dependency_predecessors {
            visitor(*predecessor);
        }
        let Some(task) = node.as_task() else {
            return;
        };
        for predecessor in &task.must_predecessors {
            visitor(*predecessor);
        }
        for finalizer in &task.finalizers {
            if let Some(group) = self.as_finalizer(self.entry(*finalizer).group) {
                group.visit_all_members(&mut visitor);
            }
        }
    }

    // ---------------------------------------------------------------------
    // State
    // ---------------------------------------------------------------------

    /// Mark a node as part of the requested work.
    pub(crate) fn require(&mut self, id: NodeId) -> Result<()> {
        if self.node(id)?.state == ExecutionState::NotRequired {
            self.transition(id, ExecutionState::Pending)?;
        }
        Ok(())
    }

    /// Move a node to `to`. Terminal states are never left.
    pub(crate) fn transition(&mut self, id: NodeId, to: ExecutionState) -> Result<()> {
        use ExecutionState::*;

        let node = self.node_mut(id)?;
        let from = node.state;
        let legal = matches!(
            (from, to),
            (NotRequired, Pending)
                | (Pending, Executing)
                | (Pending, Skipped)
                | (Pending, Succeeded)
                | (Executing, Succeeded)
                | (Executing, Failed)
                | (Executing, Skipped)
        );
        if !legal {
            return Err(PlanError::IllegalTransition { node: id, from, to });
        }
        node.state = to;
        Ok(())
    }

    pub(crate) fn record_failure(&mut self, id: NodeId, failure: NodeFailure) -> Result<()> {
        self.node_mut(id)?.failure = Some(failure);
        Ok(())
    }
}

fn task_edge_sets(node: &Node) -> (&BTreeSet<NodeId>, &BTreeSet<NodeId>) {
    match node.as_task() {
        Some(task) => (&task.should_successors, &task.must_successors),
        None => (&EMPTY, &EMPTY),
    }
}
