// src/plan/builder.rs

//! Planning phase.
//!
//! The builder owns the graph while it is being wired. `build` then decides
//! which nodes are required, classifies them into groups, synthesizes the
//! ordinal barriers, removes should edges that would close a cycle and
//! freezes the result into an [`ExecutionPlan`].

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graphmap::DiGraphMap;
use tracing::{debug, info, trace};

use crate::errors::{PlanError, Result};
use crate::plan::diagnostics::DiagnosticSink;
use crate::plan::graph::ExecutionGraph;
use crate::plan::group::{NodeGroup, OrdinalGroup};
use crate::plan::state::ExecutionPlan;
use crate::plan::task_node::TaskSpec;
use crate::types::{NodeId, OrdinalType};

#[derive(Debug)]
pub struct PlanBuilder {
    graph: ExecutionGraph,
    names: HashMap<String, NodeId>,
    /// Requested task groups, in command-line order. The index is the ordinal.
    requests: Vec<Vec<NodeId>>,
    excluded: BTreeSet<NodeId>,
    continue_on_failure: bool,
}

impl PlanBuilder {
    pub fn new(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            graph: ExecutionGraph::new(sink),
            names: HashMap::new(),
            requests: Vec::new(),
            excluded: BTreeSet::new(),
            continue_on_failure: false,
        }
    }

    pub fn graph(&self) -> &ExecutionGraph {
        &self.graph
    }

    pub fn add_task(&mut self, spec: TaskSpec) -> Result<NodeId> {
        if self.names.contains_key(&spec.name) {
            return Err(PlanError::DuplicateTask(spec.name));
        }
        let name = spec.name.clone();
        let id = self.graph.add_task(spec);
        trace!(task = %name, node = %id, "task added to plan");
        self.names.insert(name, id);
        Ok(id)
    }

    pub fn task_id(&self, name: &str) -> Result<NodeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| PlanError::UnknownTask(name.to_string()))
    }

    /// `from` depends on `to`.
    pub fn add_dependency(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.graph.task(from)?;
        self.graph.task(to)?;
        self.graph.add_dependency_successor(from, to)
    }

    pub fn add_must_run_after(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.graph.add_must_successor(from, to)
    }

    /// `from` should run after `to`.
    ///
    /// The edge is not inserted when `to` already has a hard edge back to
    /// `from`, since the two orderings could never both hold.
    pub fn add_should_run_after(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        self.graph.task(from)?;
        self.graph.task(to)?;
        if self.graph.has_hard_successor(to, from) {
            debug!(
                from = %self.graph.name_of(from),
                to = %self.graph.name_of(to),
                "ignoring shouldRunAfter that contradicts a hard edge"
            );
            return Ok(());
        }
        self.graph.add_should_successor(from, to)
    }

    pub fn add_finalized_by(&mut self, finalized: NodeId, finalizer: NodeId) -> Result<()> {
        self.graph.add_finalizing_successor(finalizer, finalized)
    }

    /// Never run `task`, nor anything only reachable through it.
    pub fn exclude(&mut self, task: NodeId) -> Result<()> {
        self.graph.task(task)?;
        self.excluded.insert(task);
        Ok(())
    }

    /// Append a requested group; the first call gets ordinal 0.
    pub fn request(&mut self, tasks: &[NodeId]) -> Result<()> {
        for task in tasks {
            self.graph.task(*task)?;
        }
        self.requests.push(tasks.to_vec());
        Ok(())
    }

    pub fn continue_on_failure(&mut self, continue_on_failure: bool) {
        self.continue_on_failure = continue_on_failure;
    }

    /// Finish planning.
    pub fn build(mut self) -> Result<ExecutionPlan> {
        self.mark_required()?;
        self.assign_ordinal_groups()?;
        self.assign_finalizer_groups()?;
        self.create_ordinal_barriers()?;

        let mut hard_graph = self.hard_edge_graph();
        if let Err(cycle) = toposort(&hard_graph, None) {
            return Err(PlanError::Cycle(format!(
                "involving '{}'",
                self.graph.name_of(cycle.node_id())
            )));
        }
        self.prune_should_cycles(&mut hard_graph)?;

        let queue = self.execution_queue();
        info!(
            nodes = queue.len(),
            requests = self.requests.len(),
            ordinal_nodes = self.graph.ordinal_nodes().len(),
            finalizer_groups = self.graph.finalizer_groups().len(),
            "execution plan built"
        );

        Ok(ExecutionPlan::new(
            self.graph,
            self.names,
            queue,
            self.continue_on_failure,
        ))
    }

    /// Walk from every requested task over dependencies and finalizers.
    fn mark_required(&mut self) -> Result<()> {
        let mut stack: Vec<NodeId> = self.requests.iter().flatten().rev().copied().collect();
        let mut visited = HashSet::new();

        while let Some(id) = stack.pop() {
            if self.excluded.contains(&id) || !visited.insert(id) {
                continue;
            }
            self.graph.require(id)?;

            let node = self.graph.node(id)?;
            if let Some(task) = node.as_task() {
                stack.extend(task.finalizers().iter().rev().copied());
            }
            stack.extend(node.dependency_successors().iter().rev().copied());
        }

        for excluded in &self.excluded {
            debug!(task = %self.graph.name_of(*excluded), "task excluded from plan");
        }
        Ok(())
    }

    /// The first requested group to reach a node claims it.
    fn assign_ordinal_groups(&mut self) -> Result<()> {
        for (index, entries) in self.requests.iter().enumerate() {
            let ordinal = u32::try_from(index).map_err(|_| {
                PlanError::ConfigError(format!("too many requested task groups ({index})"))
            })?;
            let group = NodeGroup::Ordinal(OrdinalGroup::new(ordinal));

            let mut stack: Vec<NodeId> = entries.iter().rev().copied().collect();
            while let Some(id) = stack.pop() {
                let node = self.graph.node(id)?;
                if !node.is_required() || node.group() != NodeGroup::Default {
                    continue;
                }
                let dependencies: Vec<NodeId> =
                    node.dependency_successors().iter().rev().copied().collect();
                self.graph.set_group(id, group)?;
                stack.extend(dependencies);
            }
        }
        Ok(())
    }

    /// Classify finalizers and everything only they pull in.
    ///
    /// Runs to a fixed point: whenever a node's classification changes, the
    /// finalizers of that node are visited again so they can pick up the
    /// stronger ordinal.
    fn assign_finalizer_groups(&mut self) -> Result<()> {
        let mut queue: VecDeque<NodeId> = self
            .graph
            .ids()
            .filter(|id| {
                self.graph
                    .task(*id)
                    .map(|task| !task.finalizers().is_empty())
                    .unwrap_or(false)
                    && self.graph.state(*id).is_required()
            })
            .collect();

        while let Some(finalized) = queue.pop_front() {
            let Ok(task) = self.graph.task(finalized) else {
                continue;
            };
            let finalizers: Vec<NodeId> = task.finalizers().iter().copied().collect();

            for finalizer in finalizers {
                if !self.graph.state(finalizer).is_required() {
                    continue;
                }
                let before_group = self.graph.group(finalizer);
                let before_ordinal = self.graph.as_ordinal(before_group);

                let mut changed = self
                    .graph
                    .maybe_inherit_group_as_finalizer(finalizer, finalized)?;
                let group = self.graph.group(finalizer);
                let Some(group_id) = group.as_finalizer() else {
                    continue;
                };
                if before_group.is_entry_point() {
                    // Requested finalizers keep their own ordinal as well.
                    changed |= self.graph.maybe_inherit_from(group_id, before_group);
                }
                changed |= self.graph.as_ordinal(group) != before_ordinal;

                let joined = self.absorb_finalizer_dependencies(finalizer, group)?;
                queue.extend(joined);
                if changed {
                    queue.push_back(finalizer);
                }
            }
        }
        Ok(())
    }

    /// Move the unclassified dependency closure of `finalizer` into `group`.
    ///
    /// A dependency that finalizes required work of its own is left for its
    /// own finalizer group, together with everything below it.
    fn absorb_finalizer_dependencies(
        &mut self,
        finalizer: NodeId,
        group: NodeGroup,
    ) -> Result<Vec<NodeId>> {
        let mut stack: Vec<NodeId> = self
            .graph
            .node(finalizer)?
            .dependency_successors()
            .iter()
            .rev()
            .copied()
            .collect();
        let mut visited = HashSet::new();
        let mut joined = Vec::new();

        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = self.graph.node(id)?;
            if !node.is_required() || node.group() != NodeGroup::Default {
                continue;
            }
            if self.finalizes_required_work(id) {
                continue;
            }
            let dependencies: Vec<NodeId> =
                node.dependency_successors().iter().rev().copied().collect();
            self.graph.set_group(id, group)?;
            trace!(
                node = %self.graph.name_of(id),
                finalizer = %self.graph.name_of(finalizer),
                "node joins finalizer group"
            );
            joined.push(id);
            stack.extend(dependencies);
        }
        Ok(joined)
    }

    fn finalizes_required_work(&self, id: NodeId) -> bool {
        self.graph.task(id).is_ok_and(|task| {
            task.finalizing_successors()
                .iter()
                .any(|finalized| self.graph.state(*finalized).is_required())
        })
    }

    /// Absorb destroyers and producers into their ordinal nodes, then make
    /// each of them wait for the opposing barriers of earlier groups.
    fn create_ordinal_barriers(&mut self) -> Result<()> {
        let located: Vec<(NodeId, u32, bool, bool)> = self
            .graph
            .ids()
            .filter_map(|id| {
                let node = self.graph.node(id).ok()?;
                let task = node.as_task()?;
                if !node.is_required() {
                    return None;
                }
                let ordinal = self.graph.as_ordinal(node.group())?;
                let spec = task.spec();
                Some((id, ordinal.ordinal(), spec.destroys, spec.produces))
            })
            .collect();

        let mut destroyers = Vec::new();
        let mut producers = Vec::new();
        for (id, ordinal, destroys, produces) in located {
            if destroys {
                let barrier = self.graph.ordinal_node(OrdinalType::Destroyer, ordinal);
                self.graph.require(barrier)?;
                self.graph.add_dependencies_from(barrier, id)?;
                destroyers.push((id, ordinal));
            }
            if produces {
                let barrier = self.graph.ordinal_node(OrdinalType::Producer, ordinal);
                self.graph.require(barrier)?;
                self.graph.add_dependencies_from(barrier, id)?;
                producers.push((id, ordinal));
            }
        }

        let mut hard_graph = self.hard_edge_graph();
        let gated = destroyers
            .into_iter()
            .map(|(id, ordinal)| (id, OrdinalType::Producer, ordinal))
            .chain(
                producers
                    .into_iter()
                    .map(|(id, ordinal)| (id, OrdinalType::Destroyer, ordinal)),
            );
        for (id, opposing, ordinal) in gated {
            for barrier in self.graph.ordinal_nodes().preceding(opposing, ordinal) {
                self.add_barrier_edge(&mut hard_graph, id, barrier)?;
            }
        }
        Ok(())
    }

    /// Make `task` wait for `barrier` unless the barrier already waits on
    /// `task`, in which case the edge would close a cycle and is dropped.
    fn add_barrier_edge(
        &mut self,
        hard_graph: &mut DiGraphMap<NodeId, ()>,
        task: NodeId,
        barrier: NodeId,
    ) -> Result<()> {
        if has_path_connecting(&*hard_graph, barrier, task, None) {
            debug!(
                task = %self.graph.name_of(task),
                barrier = %self.graph.name_of(barrier),
                "dropping barrier edge that would create a cycle"
            );
            return Ok(());
        }
        self.graph.add_dependency_successor(task, barrier)?;
        hard_graph.add_edge(task, barrier, ());
        Ok(())
    }

    fn hard_edge_graph(&self) -> DiGraphMap<NodeId, ()> {
        let mut graph = DiGraphMap::new();
        for id in self.graph.ids() {
            if !self.graph.state(id).is_required() {
                continue;
            }
            graph.add_node(id);
            for successor in self.graph.hard_successors(id) {
                if self.graph.state(successor).is_required() {
                    graph.add_edge(id, successor, ());
                }
            }
        }
        graph
    }

    /// Re-add should edges one at a time, dropping any that would close a
    /// cycle with the edges accepted so far.
    fn prune_should_cycles(&mut self, graph: &mut DiGraphMap<NodeId, ()>) -> Result<()> {
        let tasks: Vec<NodeId> = self
            .graph
            .ids()
            .filter(|id| self.graph.state(*id).is_required())
            .collect();

        for from in tasks {
            let Ok(task) = self.graph.task(from) else {
                continue;
            };
            let should: Vec<NodeId> = task.should_successors().iter().copied().collect();
            for to in should {
                if !self.graph.state(to).is_required() {
                    continue;
                }
                if has_path_connecting(&*graph, to, from, None) {
                    self.graph.remove_should_successor(from, to)?;
                    debug!(
                        from = %self.graph.name_of(from),
                        to = %self.graph.name_of(to),
                        "dropping shouldRunAfter that would create a cycle"
                    );
                } else {
                    graph.add_edge(from, to, ());
                }
            }
        }
        Ok(())
    }

    /// Depth-first post-order over all successors, requested tasks first.
    fn execution_queue(&self) -> Vec<NodeId> {
        let mut roots: Vec<NodeId> = self
            .requests
            .iter()
            .flatten()
            .copied()
            .filter(|id| self.graph.state(*id).is_required())
            .collect();
        let mut remaining: Vec<NodeId> = self
            .graph
            .ids()
            .filter(|id| self.graph.state(*id).is_required() && !roots.contains(id))
            .collect();
        remaining.sort_by(|a, b| self.graph.compare(*a, *b));
        roots.extend(remaining);

        let mut queue = Vec::new();
        let mut done = HashSet::new();
        let mut in_progress = HashSet::new();
        let mut stack: Vec<(NodeId, bool)> = Vec::new();

        for root in roots {
            stack.push((root, false));
            while let Some((id, expanded)) = stack.pop() {
                if expanded {
                    in_progress.remove(&id);
                    if done.insert(id) {
                        queue.push(id);
                    }
                    continue;
                }
                if done.contains(&id) || !in_progress.insert(id) {
                    continue;
                }
                stack.push((id, true));
                // Reverse order onto the stack pops in forward order.
                for successor in self.graph.all_successors_in_reverse_order(id) {
                    if self.graph.state(successor).is_required() && !done.contains(&successor) {
                        stack.push((successor, false));
                    }
                }
            }
        }
        queue
    }
}
