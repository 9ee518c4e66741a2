#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use execplan::config::{PlanFile, PlanSection, RawPlanFile, RequestSection, TaskConfig};
use execplan::plan::{ExecutionPlan, RecordingSink};
use execplan::types::DeclaredOutcome;

/// Builder for `PlanFile` to simplify test setup.
pub struct PlanFileBuilder {
    plan: RawPlanFile,
}

impl PlanFileBuilder {
    pub fn new() -> Self {
        Self {
            plan: RawPlanFile {
                plan: PlanSection::default(),
                task: BTreeMap::new(),
                request: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.plan.task.insert(name.to_string(), task);
        self
    }

    /// Append one requested group.
    pub fn request(mut self, tasks: &[&str]) -> Self {
        self.plan.request.push(RequestSection {
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
        });
        self
    }

    pub fn continue_on_failure(mut self, val: bool) -> Self {
        self.plan.plan.continue_on_failure = val;
        self
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.plan.plan.max_workers = n;
        self
    }

    pub fn raw(self) -> RawPlanFile {
        self.plan
    }

    pub fn build(self) -> PlanFile {
        PlanFile::try_from(self.plan).expect("Failed to build valid plan file from builder")
    }
}

impl Default for PlanFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the execution plan for the file's own `[[request]]` groups.
pub fn build_plan(file: &PlanFile) -> ExecutionPlan {
    file.to_builder(&[], &[], Arc::new(RecordingSink::new()))
        .expect("plan file should convert")
        .build()
        .expect("plan should build")
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new() -> Self {
        Self {
            task: TaskConfig::default(),
        }
    }

    pub fn depends_on(mut self, dep: &str) -> Self {
        self.task.depends_on.push(dep.to_string());
        self
    }

    pub fn must_run_after(mut self, other: &str) -> Self {
        self.task.must_run_after.push(other.to_string());
        self
    }

    pub fn should_run_after(mut self, other: &str) -> Self {
        self.task.should_run_after.push(other.to_string());
        self
    }

    pub fn finalized_by(mut self, finalizer: &str) -> Self {
        self.task.finalized_by.push(finalizer.to_string());
        self
    }

    pub fn from_build(mut self, build: &str) -> Self {
        self.task.build = Some(build.to_string());
        self
    }

    pub fn destroys(mut self) -> Self {
        self.task.destroys = true;
        self
    }

    pub fn produces(mut self) -> Self {
        self.task.produces = true;
        self
    }

    pub fn lock(mut self, name: &str) -> Self {
        self.task.locks.push(name.to_string());
        self
    }

    pub fn fails(mut self) -> Self {
        self.task.outcome = DeclaredOutcome::Failure;
        self
    }

    pub fn duration_ms(mut self, ms: u64) -> Self {
        self.task.duration_ms = ms;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

impl Default for TaskConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
