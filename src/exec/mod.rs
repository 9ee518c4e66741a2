// src/exec/mod.rs

//! Running a built plan.
//!
//! - [`context`] defines the `ExecutionContext` trait tasks are run through.
//! - [`locks`] holds the resource lock seam consulted before a task starts.
//! - [`worker_pool`] is the async coordinator that owns the plan while it runs.
//! - [`simulated`] is the executor used by the binary.

pub mod context;
pub mod locks;
pub mod simulated;
pub mod worker_pool;

pub use context::{ExecutionContext, ScheduledNode};
pub use locks::{DeclaredLocks, NoLocks, ResourceLock, ResourceLockProvider};
pub use simulated::SimulatedExecutor;
pub use worker_pool::WorkerPool;
