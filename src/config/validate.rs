// src/config/validate.rs

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{PlanFile, RawPlanFile};
use crate::errors::{PlanError, Result};

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = PlanError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_plan(&raw)?;
        Ok(PlanFile::new_unchecked(raw.plan, raw.task, raw.request))
    }
}

fn validate_raw_plan(cfg: &RawPlanFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_plan_section(cfg)?;
    validate_task_references(cfg)?;
    validate_requests(cfg)?;
    validate_hard_edges_acyclic(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawPlanFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(PlanError::ConfigError(
            "plan must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_plan_section(cfg: &RawPlanFile) -> Result<()> {
    if cfg.plan.max_workers == 0 {
        return Err(PlanError::ConfigError(
            "[plan].max_workers must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_task_references(cfg: &RawPlanFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        let lists = [
            ("depends_on", &task.depends_on),
            ("must_run_after", &task.must_run_after),
            ("should_run_after", &task.should_run_after),
            ("finalized_by", &task.finalized_by),
        ];
        for (field, targets) in lists {
            for target in targets.iter() {
                if !cfg.task.contains_key(target) {
                    return Err(PlanError::ConfigError(format!(
                        "task '{}' has unknown task '{}' in `{}`",
                        name, target, field
                    )));
                }
                if target == name {
                    return Err(PlanError::ConfigError(format!(
                        "task '{}' cannot reference itself in `{}`",
                        name, field
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_requests(cfg: &RawPlanFile) -> Result<()> {
    for (index, request) in cfg.request.iter().enumerate() {
        if request.tasks.is_empty() {
            return Err(PlanError::ConfigError(format!(
                "[[request]] #{} must name at least one task",
                index + 1
            )));
        }
        for task in request.tasks.iter() {
            if !cfg.task.contains_key(task) {
                return Err(PlanError::UnknownTask(task.clone()));
            }
        }
    }
    Ok(())
}

fn validate_hard_edges_acyclic(cfg: &RawPlanFile) -> Result<()> {
    // Edge direction: prerequisite -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.depends_on.iter().chain(task.must_run_after.iter()) {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
        for finalizer in task.finalized_by.iter() {
            graph.add_edge(name.as_str(), finalizer.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(PlanError::Cycle(format!(
            "task graph has a cycle involving task '{}'",
            cycle.node_id()
        ))),
    }
}
