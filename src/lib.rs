// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod plan;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::exec::{DeclaredLocks, SimulatedExecutor, WorkerPool};
use crate::plan::{DiagnosticSink, ExecutionPlan, PlanOutcome, TracingSink};

/// High-level entry point used by `main.rs`.
///
/// Loads the plan file, builds the execution plan for the requested groups
/// and either prints it (`--dry-run`) or runs it through the worker pool
/// with the simulated executor. Ctrl-C stops dispatching new work.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let file = load_and_validate(&config_path)?;

    let sink: Arc<dyn DiagnosticSink> = Arc::new(TracingSink);
    let mut builder = file.to_builder(&args.requested_groups(), &args.exclude, sink)?;
    if args.continue_on_failure {
        builder.continue_on_failure(true);
    }
    let mut plan = builder.build()?;

    if args.dry_run {
        print_dry_run(&plan);
        return Ok(());
    }

    let max_workers = args.max_workers.unwrap_or(file.plan.max_workers);
    let pool = WorkerPool::new(
        max_workers,
        Arc::new(SimulatedExecutor::from_plan_file(&file)),
    )
    .with_locks(Arc::new(DeclaredLocks::from_plan_file(&file)));

    // Ctrl-C → stop dispatching.
    {
        let shutdown = pool.shutdown_handle();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            shutdown.notify_one();
        });
    }

    info!(config = %config_path.display(), max_workers, "running plan");
    let outcome = pool.run(&mut plan).await?;
    print_summary(&outcome);
    outcome.into_result()?;
    Ok(())
}

/// Print the execution queue with groups and states.
fn print_dry_run(plan: &ExecutionPlan) {
    let graph = plan.graph();
    println!("execplan dry-run");
    println!("execution queue ({} nodes):", plan.queue().len());
    for (position, id) in plan.queue().iter().enumerate() {
        let node = match graph.node(*id) {
            Ok(node) => node,
            Err(_) => continue,
        };
        let group = match graph.as_ordinal(node.group()) {
            Some(ordinal) if node.group().as_finalizer().is_some() => {
                format!("{}, inherits {}", node.group(), ordinal)
            }
            _ => node.group().to_string(),
        };
        let kind = if node.is_ordinal() { "barrier" } else { "task" };
        println!("  {:>3}. {node} ({kind}, {group})", position + 1);

        let waits_for: Vec<String> = graph
            .hard_successors(*id)
            .filter(|successor| graph.state(*successor).is_required())
            .map(|successor| graph.name_of(successor))
            .collect();
        if !waits_for.is_empty() {
            println!("        after: {}", waits_for.join(", "));
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_summary(outcome: &PlanOutcome) {
    println!(
        "{} succeeded, {} failed, {} skipped",
        outcome.succeeded.len(),
        outcome.failed.len(),
        outcome.skipped.len()
    );
    for (name, failure) in &outcome.failed {
        println!("  FAILED {name}: {failure}");
    }
}
