use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use execplan::exec::{ExecutionContext, ScheduledNode};
use execplan::types::{NodeFailure, TaskOutcome};

#[derive(Default)]
struct Recorded {
    started: Vec<String>,
    finished: Vec<String>,
    running: usize,
    max_running: usize,
}

/// A fake execution context that:
/// - records start and finish order of every task
/// - tracks the highest number of tasks running at once
/// - fails the tasks it was told to fail, succeeds everything else.
#[derive(Clone, Default)]
pub struct FakeExecutor {
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    recorded: Arc<Mutex<Recorded>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, task: &str) -> Self {
        self.failing.insert(task.to_string());
        self
    }

    pub fn with_delay(mut self, task: &str, delay: Duration) -> Self {
        self.delays.insert(task.to_string(), delay);
        self
    }

    pub fn started(&self) -> Vec<String> {
        self.recorded.lock().unwrap().started.clone()
    }

    pub fn finished(&self) -> Vec<String> {
        self.recorded.lock().unwrap().finished.clone()
    }

    pub fn max_concurrency(&self) -> usize {
        self.recorded.lock().unwrap().max_running
    }
}

impl ExecutionContext for FakeExecutor {
    fn execute(
        &self,
        node: ScheduledNode,
    ) -> Pin<Box<dyn Future<Output = TaskOutcome> + Send + '_>> {
        let recorded = Arc::clone(&self.recorded);
        let fails = self.failing.contains(node.name());
        let delay = self.delays.get(node.name()).copied();

        Box::pin(async move {
            let name = node.name().to_string();
            {
                let mut guard = recorded.lock().unwrap();
                guard.started.push(name.clone());
                guard.running += 1;
                guard.max_running = guard.max_running.max(guard.running);
            }

            match delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => tokio::task::yield_now().await,
            }

            {
                let mut guard = recorded.lock().unwrap();
                guard.running -= 1;
                guard.finished.push(name.clone());
            }

            if fails {
                TaskOutcome::Failed(NodeFailure::new(format!("{name} failed")))
            } else {
                TaskOutcome::Success
            }
        })
    }
}
