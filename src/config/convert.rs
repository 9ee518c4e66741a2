// src/config/convert.rs

//! Turning a validated plan file into a [`PlanBuilder`].

use std::sync::Arc;

use tracing::debug;

use crate::config::model::PlanFile;
use crate::errors::{PlanError, Result};
use crate::plan::{DiagnosticSink, PlanBuilder, TaskSpec};

impl PlanFile {
    /// The `[[request]]` groups of the file, in order.
    pub fn default_requests(&self) -> Vec<Vec<String>> {
        self.request.iter().map(|r| r.tasks.clone()).collect()
    }

    /// Wire every declared task and edge, then request `requests`.
    ///
    /// An empty `requests` falls back to [`default_requests`]. Tasks are added
    /// in name order, so node ids are stable for a given file.
    ///
    /// [`default_requests`]: PlanFile::default_requests
    pub fn to_builder(
        &self,
        requests: &[Vec<String>],
        excluded: &[String],
        sink: Arc<dyn DiagnosticSink>,
    ) -> Result<PlanBuilder> {
        let mut builder = PlanBuilder::new(sink);
        builder.continue_on_failure(self.plan.continue_on_failure);

        for (name, task) in self.task.iter() {
            let mut spec = TaskSpec::new(name.as_str())
                .destroys(task.destroys)
                .produces(task.produces);
            if let Some(build) = &task.build {
                spec = spec.from_build(build.as_str());
            }
            builder.add_task(spec)?;
        }

        for (name, task) in self.task.iter() {
            let from = builder.task_id(name)?;
            for dep in task.depends_on.iter() {
                let to = builder.task_id(dep)?;
                builder.add_dependency(from, to)?;
            }
            for after in task.must_run_after.iter() {
                let to = builder.task_id(after)?;
                builder.add_must_run_after(from, to)?;
            }
            for after in task.should_run_after.iter() {
                let to = builder.task_id(after)?;
                builder.add_should_run_after(from, to)?;
            }
            for finalizer in task.finalized_by.iter() {
                let finalizer = builder.task_id(finalizer)?;
                builder.add_finalized_by(from, finalizer)?;
            }
        }

        for name in excluded {
            let id = builder.task_id(name)?;
            builder.exclude(id)?;
        }

        let requests = if requests.is_empty() {
            self.default_requests()
        } else {
            requests.to_vec()
        };
        if requests.is_empty() {
            return Err(PlanError::ConfigError(
                "no tasks requested: pass task names or add a [[request]] section".to_string(),
            ));
        }
        for group in requests.iter() {
            let ids = group
                .iter()
                .map(|name| builder.task_id(name))
                .collect::<Result<Vec<_>>>()?;
            builder.request(&ids)?;
        }
        debug!(requests = ?requests, excluded = ?excluded, "plan file converted");

        Ok(builder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::RawPlanFile;
    use crate::plan::RecordingSink;
    use crate::types::ExecutionState;

    fn plan_file(toml_src: &str) -> PlanFile {
        let raw: RawPlanFile = toml::from_str(toml_src).unwrap();
        PlanFile::try_from(raw).unwrap()
    }

    const TOML: &str = r#"
        [task.clean]
        destroys = true

        [task.compile]
        produces = true
        depends_on = ["generate"]
        finalized_by = ["report"]

        [task.generate]

        [task.report]

        [[request]]
        tasks = ["clean"]

        [[request]]
        tasks = ["compile"]
    "#;

    #[test]
    fn default_requests_come_from_the_file() {
        let file = plan_file(TOML);
        let plan = file
            .to_builder(&[], &[], Arc::new(RecordingSink::new()))
            .unwrap()
            .build()
            .unwrap();

        for name in ["clean", "compile", "generate", "report"] {
            assert_eq!(plan.state_of(name), Some(ExecutionState::Pending), "{name}");
        }
    }

    #[test]
    fn explicit_requests_replace_the_defaults() {
        let file = plan_file(TOML);
        let plan = file
            .to_builder(
                &[vec!["generate".to_string()]],
                &[],
                Arc::new(RecordingSink::new()),
            )
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(plan.state_of("generate"), Some(ExecutionState::Pending));
        assert_eq!(plan.state_of("clean"), Some(ExecutionState::NotRequired));
    }

    #[test]
    fn unknown_requested_task_is_reported() {
        let file = plan_file(TOML);
        let err = file
            .to_builder(&[vec!["deploy".to_string()]], &[], Arc::new(RecordingSink::new()))
            .unwrap_err();
        assert!(matches!(err, PlanError::UnknownTask(name) if name == "deploy"));
    }

    #[test]
    fn nothing_requested_is_a_config_error() {
        let file = plan_file("[task.a]\n");
        let err = file
            .to_builder(&[], &[], Arc::new(RecordingSink::new()))
            .unwrap_err();
        assert!(matches!(err, PlanError::ConfigError(_)));
    }

    #[test]
    fn cross_build_ordering_is_reported_to_the_sink() {
        let file = plan_file(
            r#"
            [task.a]
            must_run_after = ["b"]

            [task.b]
            build = "included"

            [[request]]
            tasks = ["a"]
            "#,
        );
        let sink = Arc::new(RecordingSink::new());
        file.to_builder(&[], &[], sink.clone()).unwrap();
        assert_eq!(sink.events().len(), 1);
    }
}
