// src/exec/context.rs

//! Pluggable execution of scheduled nodes.
//!
//! The worker pool only decides *when* a node runs. What running it means is
//! up to an [`ExecutionContext`]: the binary uses the simulated executor,
//! tests plug in a recording fake.

use std::future::Future;
use std::pin::Pin;

use crate::plan::TaskSpec;
use crate::types::{NodeId, TaskOutcome};

/// A task handed to an execution context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledNode {
    pub id: NodeId,
    pub spec: TaskSpec,
}

impl ScheduledNode {
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

pub trait ExecutionContext: Send + Sync {
    /// Run one task to completion.
    ///
    /// Failures are reported through [`TaskOutcome::Failed`]; the pool never
    /// sees an `Err` from a task.
    fn execute(
        &self,
        node: ScheduledNode,
    ) -> Pin<Box<dyn Future<Output = TaskOutcome> + Send + '_>>;
}
