// src/exec/simulated.rs

//! Executor used by the binary: every task sleeps for its declared duration
//! and reports its declared outcome.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::info;

use crate::config::PlanFile;
use crate::exec::context::{ExecutionContext, ScheduledNode};
use crate::types::{DeclaredOutcome, NodeFailure, TaskOutcome};

#[derive(Debug, Clone, Copy, Default)]
struct SimulatedTask {
    outcome: DeclaredOutcome,
    duration: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct SimulatedExecutor {
    tasks: HashMap<String, SimulatedTask>,
}

impl SimulatedExecutor {
    pub fn from_plan_file(file: &PlanFile) -> Self {
        let tasks = file
            .task
            .iter()
            .map(|(name, task)| {
                let simulated = SimulatedTask {
                    outcome: task.outcome,
                    duration: Duration::from_millis(task.duration_ms),
                };
                (name.clone(), simulated)
            })
            .collect();
        Self { tasks }
    }
}

impl ExecutionContext for SimulatedExecutor {
    fn execute(
        &self,
        node: ScheduledNode,
    ) -> Pin<Box<dyn Future<Output = TaskOutcome> + Send + '_>> {
        let task = self.tasks.get(node.name()).copied().unwrap_or_default();

        Box::pin(async move {
            info!(task = %node.name(), "running task");
            if !task.duration.is_zero() {
                tokio::time::sleep(task.duration).await;
            }
            match task.outcome {
                DeclaredOutcome::Success => TaskOutcome::Success,
                DeclaredOutcome::Skipped => TaskOutcome::Skipped,
                DeclaredOutcome::Failure => TaskOutcome::Failed(NodeFailure::new(format!(
                    "task '{}' failed",
                    node.name()
                ))),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawPlanFile;
    use crate::plan::TaskSpec;
    use crate::types::NodeId;

    #[tokio::test]
    async fn declared_failure_is_reported() {
        let raw: RawPlanFile = toml::from_str(
            r#"
            [task.ok]

            [task.broken]
            outcome = "failure"
            "#,
        )
        .unwrap();
        let executor = SimulatedExecutor::from_plan_file(&PlanFile::try_from(raw).unwrap());

        let ok = ScheduledNode {
            id: NodeId(0),
            spec: TaskSpec::new("ok"),
        };
        let broken = ScheduledNode {
            id: NodeId(1),
            spec: TaskSpec::new("broken"),
        };
        assert_eq!(executor.execute(ok).await, TaskOutcome::Success);
        assert!(matches!(executor.execute(broken).await, TaskOutcome::Failed(_)));
    }
}
