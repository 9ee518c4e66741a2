// tests/must_run_after.rs

mod common;
use crate::common::{builder, init_tracing, position, run_sequentially, task};

use execplan::types::{ExecutionState, NodeFailure, TaskOutcome};

#[test]
fn must_run_after_orders_unrelated_tasks() {
    init_tracing();
    let mut b = builder();
    let deploy = task(&mut b, "deploy");
    let test = task(&mut b, "test");
    b.add_must_run_after(deploy, test).unwrap();
    // Requested in the "wrong" order on purpose.
    b.request(&[deploy, test]).unwrap();
    let mut plan = b.build().unwrap();

    let order = run_sequentially(&mut plan, &[]);
    assert!(position(&order, "test") < position(&order, "deploy"));
}

#[test]
fn must_run_after_does_not_pull_in_work() {
    let mut b = builder();
    let deploy = task(&mut b, "deploy");
    let test = task(&mut b, "test");
    b.add_must_run_after(deploy, test).unwrap();
    b.request(&[deploy]).unwrap();
    let mut plan = b.build().unwrap();

    assert_eq!(plan.state_of("test"), Some(ExecutionState::NotRequired));
    let order = run_sequentially(&mut plan, &[]);
    assert_eq!(order, vec!["deploy".to_string()]);
}

#[test]
fn failed_must_predecessor_blocks_task_by_default() {
    init_tracing();
    let mut b = builder();
    let a = task(&mut b, "a");
    let prior = task(&mut b, "b");
    b.add_must_run_after(a, prior).unwrap();
    b.request(&[a, prior]).unwrap();
    let mut plan = b.build().unwrap();

    assert_eq!(plan.select_next(|_, _| true).unwrap(), Some(prior));
    // While b runs, a is not offered.
    assert_eq!(plan.select_next(|_, _| true).unwrap(), None);
    plan.finish(prior, TaskOutcome::Failed(NodeFailure::new("b broke")))
        .unwrap();

    assert_eq!(plan.select_next(|_, _| true).unwrap(), None);
    let outcome = plan.outcome();
    assert_eq!(outcome.failed.len(), 1);
    assert_eq!(outcome.failed[0].0, "b");
    assert_eq!(outcome.skipped, vec!["a".to_string()]);
}

#[test]
fn failed_must_predecessor_does_not_block_when_continuing() {
    let mut b = builder();
    let a = task(&mut b, "a");
    let prior = task(&mut b, "b");
    b.add_must_run_after(a, prior).unwrap();
    b.request(&[a, prior]).unwrap();
    b.continue_on_failure(true);
    let mut plan = b.build().unwrap();

    let order = run_sequentially(&mut plan, &["b"]);
    assert_eq!(order, vec!["b".to_string(), "a".to_string()]);
}

#[test]
fn should_run_after_orders_when_possible() {
    let mut b = builder();
    let lint = task(&mut b, "lint");
    let compile = task(&mut b, "compile");
    b.add_should_run_after(lint, compile).unwrap();
    b.request(&[lint, compile]).unwrap();
    let mut plan = b.build().unwrap();

    let order = run_sequentially(&mut plan, &[]);
    assert_eq!(order, vec!["compile".to_string(), "lint".to_string()]);
}

#[test]
fn conflicting_should_run_after_is_dropped_not_fatal() {
    let mut b = builder();
    let a = task(&mut b, "a");
    let c = task(&mut b, "c");
    b.add_dependency(c, a).unwrap();
    b.add_should_run_after(a, c).unwrap();
    b.request(&[c]).unwrap();
    let mut plan = b.build().unwrap();

    let order = run_sequentially(&mut plan, &[]);
    assert_eq!(order, vec!["a".to_string(), "c".to_string()]);
}
