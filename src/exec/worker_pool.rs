// src/exec/worker_pool.rs

//! Async coordinator driving an [`ExecutionPlan`] to completion.
//!
//! One coordinator loop owns the plan, so every state read and write is
//! serialized through it. Selected nodes are executed in their own Tokio
//! tasks and report back over an mpsc channel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Notify, mpsc};
use tracing::{debug, error, info, warn};

use crate::errors::{PlanError, Result};
use crate::exec::context::{ExecutionContext, ScheduledNode};
use crate::exec::locks::{LockRegistry, NoLocks, ResourceLock, ResourceLockProvider};
use crate::plan::{ExecutionPlan, PlanOutcome};
use crate::types::{NodeFailure, NodeId, TaskOutcome};

#[derive(Debug)]
enum WorkerEvent {
    Completed { node: NodeId, outcome: TaskOutcome },
}

pub struct WorkerPool {
    max_workers: usize,
    context: Arc<dyn ExecutionContext>,
    locks: Arc<dyn ResourceLockProvider>,
    shutdown: Arc<Notify>,
}

impl WorkerPool {
    /// `max_workers` is clamped to at least one.
    pub fn new(max_workers: usize, context: Arc<dyn ExecutionContext>) -> Self {
        Self {
            max_workers: max_workers.max(1),
            context,
            locks: Arc::new(NoLocks),
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn with_locks(mut self, locks: Arc<dyn ResourceLockProvider>) -> Self {
        self.locks = locks;
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Notifying this handle stops dispatching new work. Running tasks are
    /// awaited and everything still pending is skipped.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    pub async fn run(&self, plan: &mut ExecutionPlan) -> Result<PlanOutcome> {
        let (tx, mut rx) = mpsc::channel::<WorkerEvent>(self.max_workers * 2);
        let mut registry = LockRegistry::default();
        let mut in_flight: HashMap<NodeId, Vec<ResourceLock>> = HashMap::new();
        let mut shutting_down = false;

        info!(
            max_workers = self.max_workers,
            nodes = plan.queue().len(),
            "worker pool started"
        );

        loop {
            while !shutting_down && in_flight.len() < self.max_workers {
                let locks = &*self.locks;
                let held = &registry;
                let next = plan.select_next(|_, spec| held.available(&locks.handles_for(spec)))?;
                let Some(id) = next else {
                    break;
                };

                let spec = plan.graph().task(id)?.spec().clone();
                let handles = self.locks.handles_for(&spec);
                registry.acquire(&handles);
                in_flight.insert(id, handles);
                self.dispatch(ScheduledNode { id, spec }, tx.clone());
            }

            if in_flight.is_empty() {
                if plan.is_finished() {
                    break;
                }
                error!("no task is running and none can be selected");
                return Err(PlanError::Other(anyhow::anyhow!(
                    "execution plan stalled with unfinished nodes"
                )));
            }

            tokio::select! {
                event = rx.recv() => {
                    // The coordinator keeps a sender, so the channel stays open.
                    let Some(WorkerEvent::Completed { node, outcome }) = event else {
                        break;
                    };
                    if let Some(handles) = in_flight.remove(&node) {
                        registry.release(&handles);
                    }
                    plan.finish(node, outcome)?;
                }
                _ = self.shutdown.notified(), if !shutting_down => {
                    warn!(running = in_flight.len(), "shutdown requested; waiting for running tasks");
                    shutting_down = true;
                    plan.abandon_pending()?;
                }
            }
        }

        let outcome = plan.outcome();
        info!(
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            skipped = outcome.skipped.len(),
            "worker pool finished"
        );
        Ok(outcome)
    }

    fn dispatch(&self, node: ScheduledNode, tx: mpsc::Sender<WorkerEvent>) {
        let context = Arc::clone(&self.context);
        let id = node.id;
        let name = node.name().to_string();
        debug!(task = %name, "dispatching task");

        tokio::spawn(async move {
            let worker = tokio::spawn(async move { context.execute(node).await });
            let outcome = match worker.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(task = %name, error = %err, "task worker panicked");
                    TaskOutcome::Failed(NodeFailure::new(format!("worker panicked: {err}")))
                }
            };
            if tx
                .send(WorkerEvent::Completed { node: id, outcome })
                .await
                .is_err()
            {
                debug!(task = %name, "worker pool gone before completion was reported");
            }
        });
    }
}
