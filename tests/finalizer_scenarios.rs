// tests/finalizer_scenarios.rs

mod common;
use crate::common::{builder, init_tracing, position, run_sequentially, task};

use execplan::types::{ExecutionState, NodeFailure, TaskOutcome};

#[test]
fn finalizer_runs_after_successful_task() {
    init_tracing();
    let mut b = builder();
    let t = task(&mut b, "test");
    let f = task(&mut b, "report");
    b.add_finalized_by(t, f).unwrap();
    b.request(&[t]).unwrap();
    let mut plan = b.build().unwrap();

    // The finalizer is not offered while the finalized task is pending.
    assert_eq!(plan.select_next(|_, _| true).unwrap(), Some(t));
    assert_eq!(plan.select_next(|_, _| true).unwrap(), None);
    plan.finish(t, TaskOutcome::Success).unwrap();
    assert_eq!(plan.select_next(|_, _| true).unwrap(), Some(f));
}

#[test]
fn finalizer_runs_after_failed_task() {
    init_tracing();
    let mut b = builder();
    let t = task(&mut b, "test");
    let f = task(&mut b, "report");
    b.add_finalized_by(t, f).unwrap();
    b.request(&[t]).unwrap();
    let mut plan = b.build().unwrap();

    let order = run_sequentially(&mut plan, &["test"]);
    assert_eq!(order, vec!["test".to_string(), "report".to_string()]);
    assert_eq!(plan.state_of("test"), Some(ExecutionState::Failed));
    assert_eq!(plan.state_of("report"), Some(ExecutionState::Succeeded));
}

#[test]
fn finalizer_is_skipped_when_finalized_task_never_ran() {
    init_tracing();
    let mut b = builder();
    let setup = task(&mut b, "setup");
    let t = task(&mut b, "test");
    let f = task(&mut b, "report");
    b.add_dependency(t, setup).unwrap();
    b.add_finalized_by(t, f).unwrap();
    b.request(&[t]).unwrap();
    let mut plan = b.build().unwrap();

    let order = run_sequentially(&mut plan, &["setup"]);
    assert_eq!(order, vec!["setup".to_string()]);
    assert_eq!(plan.state_of("test"), Some(ExecutionState::Skipped));
    assert_eq!(plan.state_of("report"), Some(ExecutionState::Skipped));
}

#[test]
fn finalizer_dependencies_run_only_after_finalized_task() {
    init_tracing();
    let mut b = builder();
    let t = task(&mut b, "integrationTest");
    let stop = task(&mut b, "stopServer");
    let collect = task(&mut b, "collectLogs");
    b.add_finalized_by(t, stop).unwrap();
    b.add_dependency(stop, collect).unwrap();
    b.request(&[t]).unwrap();
    let mut plan = b.build().unwrap();

    let order = run_sequentially(&mut plan, &[]);
    assert!(position(&order, "integrationTest") < position(&order, "collectLogs"));
    assert!(position(&order, "collectLogs") < position(&order, "stopServer"));
}

#[test]
fn finalizer_waits_for_every_finalized_task() {
    init_tracing();
    let mut b = builder();
    let a = task(&mut b, "unitTest");
    let c = task(&mut b, "integrationTest");
    let f = task(&mut b, "aggregateReport");
    b.add_finalized_by(a, f).unwrap();
    b.add_finalized_by(c, f).unwrap();
    b.request(&[a, c]).unwrap();
    let mut plan = b.build().unwrap();

    assert_eq!(plan.select_next(|_, _| true).unwrap(), Some(a));
    plan.finish(a, TaskOutcome::Failed(NodeFailure::new("red"))).unwrap();
    // Stop-after-failure skips integrationTest; the finalizer still runs
    // because one finalized task was attempted.
    assert_eq!(plan.state_of("integrationTest"), Some(ExecutionState::Skipped));
    assert_eq!(plan.select_next(|_, _| true).unwrap(), Some(f));
}

#[test]
fn requested_finalizer_keeps_running_in_its_own_group() {
    init_tracing();
    let mut b = builder();
    let build = task(&mut b, "build");
    let cleanup = task(&mut b, "cleanup");
    b.add_finalized_by(build, cleanup).unwrap();
    b.request(&[cleanup]).unwrap();
    b.request(&[build]).unwrap();
    let mut plan = b.build().unwrap();

    let group = plan.graph().group(cleanup);
    assert!(group.as_finalizer().is_some());
    assert_eq!(
        plan.graph().as_ordinal(group).map(|g| g.ordinal()),
        Some(1)
    );

    let order = run_sequentially(&mut plan, &[]);
    assert_eq!(order, vec!["build".to_string(), "cleanup".to_string()]);
}

#[test]
fn single_finalizer_edge_creates_one_group() {
    let mut b = builder();
    let t = task(&mut b, "test");
    let f = task(&mut b, "report");
    b.add_finalized_by(t, f).unwrap();
    b.request(&[t]).unwrap();
    let plan = b.build().unwrap();
    let graph = plan.graph();

    let group = graph.as_finalizer(graph.group(f)).unwrap();
    assert_eq!(group.members(), &[f]);
    assert_eq!(group.ordinal().map(|g| g.ordinal()), Some(0));
    assert_eq!(graph.finalizer_groups().len(), 1);
}

#[test]
fn finalizer_needed_by_another_finalizer_still_waits_for_its_own_task() {
    init_tracing();
    let mut b = builder();
    let u = task(&mut b, "unitTest");
    let t = task(&mut b, "integrationTest");
    let f0 = task(&mut b, "publishReports");
    let f = task(&mut b, "stopServer");
    b.add_finalized_by(u, f0).unwrap();
    b.add_finalized_by(t, f).unwrap();
    b.add_dependency(f0, f).unwrap();
    b.request(&[u, t]).unwrap();
    let mut plan = b.build().unwrap();

    assert_eq!(plan.select_next(|_, _| true).unwrap(), Some(u));
    assert_eq!(plan.select_next(|_, _| true).unwrap(), Some(t));
    plan.finish(u, TaskOutcome::Success).unwrap();
    assert_eq!(plan.select_next(|_, _| true).unwrap(), None);

    plan.finish(t, TaskOutcome::Success).unwrap();
    assert_eq!(plan.select_next(|_, _| true).unwrap(), Some(f));
    plan.finish(f, TaskOutcome::Success).unwrap();
    assert_eq!(plan.select_next(|_, _| true).unwrap(), Some(f0));
}

#[test]
fn finalizer_needed_by_another_finalizer_is_skipped_with_its_task() {
    init_tracing();
    let mut b = builder();
    let setup = task(&mut b, "startServer");
    let u = task(&mut b, "unitTest");
    let t = task(&mut b, "integrationTest");
    let f0 = task(&mut b, "publishReports");
    let f = task(&mut b, "stopServer");
    b.add_dependency(t, setup).unwrap();
    b.add_finalized_by(u, f0).unwrap();
    b.add_finalized_by(t, f).unwrap();
    b.add_dependency(f0, f).unwrap();
    b.request(&[u, t]).unwrap();
    b.continue_on_failure(true);
    let mut plan = b.build().unwrap();

    let order = run_sequentially(&mut plan, &["startServer"]);
    assert_eq!(order, vec!["unitTest".to_string(), "startServer".to_string()]);
    assert_eq!(plan.state_of("integrationTest"), Some(ExecutionState::Skipped));
    assert_eq!(plan.state_of("stopServer"), Some(ExecutionState::Skipped));
    assert_eq!(plan.state_of("publishReports"), Some(ExecutionState::Skipped));
}

#[test]
fn chained_finalizers_classify_the_same_in_every_discovery_order() {
    init_tracing();
    let names = ["compile", "test", "report", "publish"];
    // test depends on compile, report finalizes test, publish finalizes report.
    let orders = [[0, 1, 2, 3], [3, 2, 1, 0], [2, 0, 3, 1], [1, 3, 0, 2]];
    for order in orders {
        let mut b = builder();
        let mut ids = Vec::new();
        for index in order {
            ids.push((index, task(&mut b, names[index])));
        }
        ids.sort();
        let id = |i: usize| ids[i].1;
        b.add_dependency(id(1), id(0)).unwrap();
        b.add_finalized_by(id(1), id(2)).unwrap();
        b.add_finalized_by(id(2), id(3)).unwrap();
        b.request(&[id(1)]).unwrap();
        let mut plan = b.build().unwrap();

        let order_run = run_sequentially(&mut plan, &[]);
        assert_eq!(
            order_run,
            vec!["compile", "test", "report", "publish"],
            "discovery order {order:?}"
        );
    }
}
