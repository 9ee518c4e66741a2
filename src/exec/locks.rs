// src/exec/locks.rs

//! Resource locks gating task selection.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::config::PlanFile;
use crate::plan::TaskSpec;

/// Opaque name of a resource at most one running task may hold.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceLock(String);

impl ResourceLock {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait ResourceLockProvider: Send + Sync {
    fn resources_to_lock(&self, task: &TaskSpec) -> Vec<ResourceLock>;

    /// Lock shared by every task of the same partition, if any.
    fn owning_partition(&self, _task: &TaskSpec) -> Option<ResourceLock> {
        None
    }

    /// Every handle `task` needs before it may start.
    fn handles_for(&self, task: &TaskSpec) -> Vec<ResourceLock> {
        let mut handles = self.resources_to_lock(task);
        handles.extend(self.owning_partition(task));
        handles
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocks;

impl ResourceLockProvider for NoLocks {
    fn resources_to_lock(&self, _task: &TaskSpec) -> Vec<ResourceLock> {
        Vec::new()
    }
}

/// Locks declared per task in a plan file.
#[derive(Debug, Clone, Default)]
pub struct DeclaredLocks {
    by_task: HashMap<String, Vec<ResourceLock>>,
    partition_by_build: bool,
}

impl DeclaredLocks {
    pub fn new(partition_by_build: bool) -> Self {
        Self {
            by_task: HashMap::new(),
            partition_by_build,
        }
    }

    pub fn with_lock(mut self, task: &str, lock: &str) -> Self {
        self.by_task
            .entry(task.to_string())
            .or_default()
            .push(ResourceLock::new(lock));
        self
    }

    pub fn from_plan_file(file: &PlanFile) -> Self {
        let by_task = file
            .task
            .iter()
            .filter(|(_, task)| !task.locks.is_empty())
            .map(|(name, task)| {
                let locks = task.locks.iter().map(ResourceLock::new).collect();
                (name.clone(), locks)
            })
            .collect();
        Self {
            by_task,
            partition_by_build: file.plan.partition_by_build,
        }
    }
}

impl ResourceLockProvider for DeclaredLocks {
    fn resources_to_lock(&self, task: &TaskSpec) -> Vec<ResourceLock> {
        self.by_task.get(&task.name).cloned().unwrap_or_default()
    }

    fn owning_partition(&self, task: &TaskSpec) -> Option<ResourceLock> {
        if !self.partition_by_build {
            return None;
        }
        task.build
            .as_ref()
            .map(|build| ResourceLock::new(format!("build:{build}")))
    }
}

/// Handles currently held by running tasks.
#[derive(Debug, Default)]
pub(crate) struct LockRegistry {
    held: HashSet<ResourceLock>,
}

impl LockRegistry {
    pub(crate) fn available(&self, handles: &[ResourceLock]) -> bool {
        handles.iter().all(|handle| !self.held.contains(handle))
    }

    pub(crate) fn acquire(&mut self, handles: &[ResourceLock]) {
        self.held.extend(handles.iter().cloned());
    }

    pub(crate) fn release(&mut self, handles: &[ResourceLock]) {
        for handle in handles {
            self.held.remove(handle);
        }
    }
}
