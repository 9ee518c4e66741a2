#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;

use execplan::plan::{ExecutionPlan, PlanBuilder, RecordingSink, TaskSpec};
use execplan::types::{NodeFailure, NodeId, TaskOutcome};

pub use execplan_test_utils::init_tracing;

pub fn builder() -> PlanBuilder {
    PlanBuilder::new(Arc::new(RecordingSink::new()))
}

pub fn task(b: &mut PlanBuilder, name: &str) -> NodeId {
    b.add_task(TaskSpec::new(name)).unwrap()
}

/// Run a plan one task at a time, finishing each task as soon as it is
/// handed out. Returns task names in execution order.
pub fn run_sequentially(plan: &mut ExecutionPlan, failing: &[&str]) -> Vec<String> {
    let failing: HashSet<&str> = failing.iter().copied().collect();
    let mut order = Vec::new();

    while let Some(id) = plan.select_next(|_, _| true).unwrap() {
        let name = plan.graph().name_of(id);
        let outcome = if failing.contains(name.as_str()) {
            TaskOutcome::Failed(NodeFailure::new(format!("{name} failed")))
        } else {
            TaskOutcome::Success
        };
        plan.finish(id, outcome).unwrap();
        order.push(name);
    }

    assert!(plan.is_finished(), "plan stalled: {:?}", plan.outcome());
    order
}

pub fn position(order: &[String], name: &str) -> usize {
    order
        .iter()
        .position(|n| n == name)
        .unwrap_or_else(|| panic!("{name} did not run: {order:?}"))
}
