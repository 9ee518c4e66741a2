// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::DeclaredOutcome;

/// Plan description as read from a TOML file.
///
/// ```toml
/// [plan]
/// continue_on_failure = false
/// max_workers = 4
///
/// [task.clean]
/// destroys = true
///
/// [task.compile]
/// produces = true
/// depends_on = ["generate"]
/// finalized_by = ["report"]
///
/// [[request]]
/// tasks = ["clean"]
///
/// [[request]]
/// tasks = ["compile"]
/// ```
///
/// All sections are optional at this stage; [`PlanFile`] is the validated form.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlanFile {
    #[serde(default)]
    pub plan: PlanSection,

    /// Keys are task names.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// Default requested groups when none are given on the command line.
    #[serde(default)]
    pub request: Vec<RequestSection>,
}

/// Validated plan description.
///
/// Only constructed through `TryFrom<RawPlanFile>`, so every task reference
/// is known to resolve.
#[derive(Debug, Clone)]
pub struct PlanFile {
    pub plan: PlanSection,
    pub task: BTreeMap<String, TaskConfig>,
    pub request: Vec<RequestSection>,
}

impl PlanFile {
    pub(crate) fn new_unchecked(
        plan: PlanSection,
        task: BTreeMap<String, TaskConfig>,
        request: Vec<RequestSection>,
    ) -> Self {
        Self {
            plan,
            task,
            request,
        }
    }
}

/// `[plan]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanSection {
    /// Keep running independent work after a task failed.
    #[serde(default)]
    pub continue_on_failure: bool,

    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Serialize tasks coming from the same other build.
    #[serde(default)]
    pub partition_by_build: bool,
}

fn default_max_workers() -> usize {
    4
}

impl Default for PlanSection {
    fn default() -> Self {
        Self {
            continue_on_failure: false,
            max_workers: default_max_workers(),
            partition_by_build: false,
        }
    }
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    /// Hard dependencies.
    #[serde(default)]
    pub depends_on: Vec<String>,

    #[serde(default)]
    pub must_run_after: Vec<String>,

    #[serde(default)]
    pub should_run_after: Vec<String>,

    /// Tasks that run after this one whatever its outcome.
    #[serde(default)]
    pub finalized_by: Vec<String>,

    /// Name of the build this task comes from, if not the current one.
    #[serde(default)]
    pub build: Option<String>,

    #[serde(default)]
    pub destroys: bool,

    #[serde(default)]
    pub produces: bool,

    /// Named resources held while the task runs.
    #[serde(default)]
    pub locks: Vec<String>,

    /// Outcome reported by the simulated executor.
    #[serde(default)]
    pub outcome: DeclaredOutcome,

    #[serde(default)]
    pub duration_ms: u64,
}

/// One `[[request]]` entry; each entry becomes one ordinal group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestSection {
    pub tasks: Vec<String>,
}
