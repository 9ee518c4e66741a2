// src/plan/state.rs

//! Execution phase of a built plan.
//!
//! The structure of the graph is frozen here; only node states move. The
//! plan hands out one ready node at a time and is told when it finished.

use std::collections::HashMap;

use tracing::{debug, info, trace, warn};

use crate::errors::{PlanError, Result};
use crate::plan::graph::ExecutionGraph;
use crate::plan::task_node::TaskSpec;
use crate::types::{ExecutionState, NodeFailure, NodeId, TaskOutcome};

#[derive(Debug)]
pub struct ExecutionPlan {
    graph: ExecutionGraph,
    names: HashMap<String, NodeId>,
    queue: Vec<NodeId>,
    continue_on_failure: bool,
}

impl ExecutionPlan {
    pub(crate) fn new(
        graph: ExecutionGraph,
        names: HashMap<String, NodeId>,
        queue: Vec<NodeId>,
        continue_on_failure: bool,
    ) -> Self {
        Self {
            graph,
            names,
            queue,
            continue_on_failure,
        }
    }

    pub fn graph(&self) -> &ExecutionGraph {
        &self.graph
    }

    /// Required nodes in the order they are considered for execution.
    pub fn queue(&self) -> &[NodeId] {
        &self.queue
    }

    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn state_of(&self, name: &str) -> Option<ExecutionState> {
        self.node_id(name).map(|id| self.graph.state(id))
    }

    /// Task names in queue order, ordinal nodes left out.
    pub fn task_names(&self) -> Vec<String> {
        self.queue
            .iter()
            .filter_map(|id| self.graph.task(*id).ok())
            .map(|task| task.name().to_string())
            .collect()
    }

    /// Hand out the next task that may run, or `None` if nothing is ready.
    ///
    /// `can_lock` is asked last, after dependency checks pass; returning
    /// `false` leaves the task pending for a later call. Ordinal nodes whose
    /// dependencies are complete are marked succeeded on the way, and tasks
    /// whose dependencies did not succeed are skipped.
    pub fn select_next(
        &mut self,
        mut can_lock: impl FnMut(NodeId, &TaskSpec) -> bool,
    ) -> Result<Option<NodeId>> {
        loop {
            let mut progressed = false;

            for index in 0..self.queue.len() {
                let id = self.queue[index];
                if self.graph.state(id) != ExecutionState::Pending
                    || !self.graph.dependencies_complete(id)
                {
                    continue;
                }

                if self.graph.node(id)?.is_ordinal() {
                    self.graph.transition(id, ExecutionState::Succeeded)?;
                    trace!(node = %self.graph.name_of(id), "ordinal barrier passed");
                    progressed = true;
                    continue;
                }

                if !self.graph.all_dependencies_successful(id) {
                    self.graph.transition(id, ExecutionState::Skipped)?;
                    info!(
                        task = %self.graph.name_of(id),
                        "skipping task: dependencies did not succeed"
                    );
                    progressed = true;
                    continue;
                }

                if !can_lock(id, self.graph.task(id)?.spec()) {
                    trace!(task = %self.graph.name_of(id), "task ready but resources are busy");
                    continue;
                }

                self.graph.transition(id, ExecutionState::Executing)?;
                debug!(task = %self.graph.name_of(id), "task selected for execution");
                return Ok(Some(id));
            }

            if !progressed {
                return Ok(None);
            }
        }
    }

    /// Record the result of a node handed out by [`select_next`].
    ///
    /// [`select_next`]: ExecutionPlan::select_next
    pub fn finish(&mut self, id: NodeId, outcome: TaskOutcome) -> Result<()> {
        let state = self.graph.state(id);
        if state != ExecutionState::Executing {
            return Err(PlanError::IllegalTransition {
                node: id,
                from: state,
                to: match outcome {
                    TaskOutcome::Success => ExecutionState::Succeeded,
                    TaskOutcome::Failed(_) => ExecutionState::Failed,
                    TaskOutcome::Skipped => ExecutionState::Skipped,
                },
            });
        }

        match outcome {
            TaskOutcome::Success => {
                self.graph.transition(id, ExecutionState::Succeeded)?;
                debug!(task = %self.graph.name_of(id), "task succeeded");
            }
            TaskOutcome::Skipped => {
                self.graph.transition(id, ExecutionState::Skipped)?;
                debug!(task = %self.graph.name_of(id), "task skipped by executor");
            }
            TaskOutcome::Failed(failure) => {
                warn!(task = %self.graph.name_of(id), error = %failure, "task failed");
                self.graph.record_failure(id, failure)?;
                self.graph.transition(id, ExecutionState::Failed)?;
                if !self.continue_on_failure {
                    self.stop_after_failure()?;
                }
            }
        }
        Ok(())
    }

    /// Skip every pending task that is not a finalizer-group member.
    fn stop_after_failure(&mut self) -> Result<()> {
        let abandoned: Vec<NodeId> = self
            .queue
            .iter()
            .copied()
            .filter(|id| {
                let graph = &self.graph;
                graph.state(*id) == ExecutionState::Pending
                    && graph.group(*id).as_finalizer().is_none()
                    && graph.task(*id).is_ok()
            })
            .collect();

        for id in &abandoned {
            self.graph.transition(*id, ExecutionState::Skipped)?;
        }
        if !abandoned.is_empty() {
            info!(
                count = abandoned.len(),
                "stopping after failure; remaining tasks will not run"
            );
        }
        Ok(())
    }

    /// Skip every pending node, finalizers included. Running nodes are left
    /// to finish.
    pub fn abandon_pending(&mut self) -> Result<()> {
        let pending: Vec<NodeId> = self
            .queue
            .iter()
            .copied()
            .filter(|id| self.graph.state(*id) == ExecutionState::Pending)
            .collect();
        for id in &pending {
            self.graph.transition(*id, ExecutionState::Skipped)?;
        }
        info!(count = pending.len(), "pending nodes abandoned");
        Ok(())
    }

    pub fn has_executing(&self) -> bool {
        self.queue
            .iter()
            .any(|id| self.graph.state(*id) == ExecutionState::Executing)
    }

    /// No node is pending or executing.
    pub fn is_finished(&self) -> bool {
        self.queue.iter().all(|id| self.graph.state(*id).is_complete())
    }

    pub fn outcome(&self) -> PlanOutcome {
        let mut outcome = PlanOutcome::default();
        for id in &self.queue {
            let Ok(task) = self.graph.task(*id) else {
                continue;
            };
            let name = task.name().to_string();
            match self.graph.state(*id) {
                ExecutionState::Succeeded => outcome.succeeded.push(name),
                ExecutionState::Skipped => outcome.skipped.push(name),
                ExecutionState::Failed => {
                    let failure = self
                        .graph
                        .node(*id)
                        .ok()
                        .and_then(|node| node.failure().cloned())
                        .unwrap_or_else(|| NodeFailure::new("task failed"));
                    outcome.failed.push((name, failure));
                }
                ExecutionState::Pending | ExecutionState::Executing => {
                    outcome.unfinished.push(name)
                }
                ExecutionState::NotRequired => {}
            }
        }
        outcome
    }
}

/// Summary of a finished (or abandoned) plan, in execution-queue order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOutcome {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, NodeFailure)>,
    pub skipped: Vec<String>,
    pub unfinished: Vec<String>,
}

impl PlanOutcome {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.unfinished.is_empty()
    }

    pub fn into_result(self) -> Result<Self> {
        if self.failed.is_empty() {
            Ok(self)
        } else {
            Err(PlanError::TasksFailed(
                self.failed.into_iter().map(|(name, _)| name).collect(),
            ))
        }
    }
}
