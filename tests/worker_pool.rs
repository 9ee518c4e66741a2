// tests/worker_pool.rs

mod common;
use crate::common::{init_tracing, position};

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use execplan::errors::PlanError;
use execplan::exec::{DeclaredLocks, WorkerPool};
use execplan_test_utils::builders::{PlanFileBuilder, TaskConfigBuilder, build_plan};
use execplan_test_utils::fake_executor::FakeExecutor;
use execplan_test_utils::{with_timeout, with_timeout_of};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn runs_dependencies_before_dependents() -> TestResult {
    init_tracing();
    let file = PlanFileBuilder::new()
        .with_task("generate", TaskConfigBuilder::new().build())
        .with_task("compile", TaskConfigBuilder::new().depends_on("generate").build())
        .with_task("test", TaskConfigBuilder::new().depends_on("compile").build())
        .request(&["test"])
        .build();
    let mut plan = build_plan(&file);

    let executor = FakeExecutor::new();
    let pool = WorkerPool::new(4, Arc::new(executor.clone()));
    let outcome = with_timeout(pool.run(&mut plan)).await?;

    assert!(outcome.is_success());
    assert_eq!(executor.finished(), vec!["generate", "compile", "test"]);
    Ok(())
}

#[tokio::test]
async fn independent_tasks_run_concurrently_up_to_the_limit() -> TestResult {
    init_tracing();
    let mut builder = PlanFileBuilder::new();
    let mut executor = FakeExecutor::new();
    let mut names = Vec::new();
    for i in 0..6 {
        let name = format!("task_{i}");
        builder = builder.with_task(&name, TaskConfigBuilder::new().build());
        executor = executor.with_delay(&name, Duration::from_millis(30));
        names.push(name);
    }
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let file = builder.request(&refs).build();
    let mut plan = build_plan(&file);

    let pool = WorkerPool::new(2, Arc::new(executor.clone()));
    let outcome = with_timeout(pool.run(&mut plan)).await?;

    assert_eq!(outcome.succeeded.len(), 6);
    assert_eq!(executor.max_concurrency(), 2);
    Ok(())
}

#[tokio::test]
async fn shared_lock_serializes_tasks() -> TestResult {
    init_tracing();
    let file = PlanFileBuilder::new()
        .with_task("migrate_a", TaskConfigBuilder::new().lock("db").build())
        .with_task("migrate_b", TaskConfigBuilder::new().lock("db").build())
        .request(&["migrate_a", "migrate_b"])
        .build();
    let mut plan = build_plan(&file);

    let executor = FakeExecutor::new()
        .with_delay("migrate_a", Duration::from_millis(20))
        .with_delay("migrate_b", Duration::from_millis(20));
    let pool = WorkerPool::new(4, Arc::new(executor.clone()))
        .with_locks(Arc::new(DeclaredLocks::from_plan_file(&file)));
    with_timeout(pool.run(&mut plan)).await?;

    assert_eq!(executor.max_concurrency(), 1);
    Ok(())
}

#[tokio::test]
async fn finalizer_runs_after_failure_and_plan_reports_it() -> TestResult {
    init_tracing();
    let file = PlanFileBuilder::new()
        .with_task("startServer", TaskConfigBuilder::new().build())
        .with_task(
            "integrationTest",
            TaskConfigBuilder::new()
                .depends_on("startServer")
                .finalized_by("stopServer")
                .build(),
        )
        .with_task("stopServer", TaskConfigBuilder::new().build())
        .with_task("publish", TaskConfigBuilder::new().must_run_after("integrationTest").build())
        .request(&["integrationTest", "publish"])
        .build();
    let mut plan = build_plan(&file);

    let executor = FakeExecutor::new().failing("integrationTest");
    let pool = WorkerPool::new(2, Arc::new(executor.clone()));
    let outcome = with_timeout(pool.run(&mut plan)).await?;

    let started = executor.started();
    assert!(position(&started, "integrationTest") < position(&started, "stopServer"));
    assert!(!started.contains(&"publish".to_string()));
    assert_eq!(outcome.skipped, vec!["publish".to_string()]);

    match outcome.into_result() {
        Err(PlanError::TasksFailed(names)) => assert_eq!(names, vec!["integrationTest"]),
        other => panic!("expected TasksFailed, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn shutdown_skips_pending_work_and_waits_for_running_tasks() -> TestResult {
    init_tracing();
    let file = PlanFileBuilder::new()
        .with_task("slow", TaskConfigBuilder::new().build())
        .with_task("after", TaskConfigBuilder::new().depends_on("slow").build())
        .request(&["after"])
        .build();
    let mut plan = build_plan(&file);

    let executor = FakeExecutor::new().with_delay("slow", Duration::from_millis(50));
    let pool = WorkerPool::new(1, Arc::new(executor.clone()));
    // A stored permit is consumed on the first wait.
    pool.shutdown_handle().notify_one();
    let outcome = with_timeout_of(Duration::from_secs(1), pool.run(&mut plan)).await?;

    assert_eq!(executor.finished(), vec!["slow"]);
    assert_eq!(outcome.succeeded, vec!["slow".to_string()]);
    assert_eq!(outcome.skipped, vec!["after".to_string()]);
    Ok(())
}
