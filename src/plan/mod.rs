// src/plan/mod.rs

//! Execution plan graph.
//!
//! - [`builder`] wires tasks and edges and turns them into a plan.
//! - [`graph`] is the node arena with all successor views and predicates.
//! - [`state`] drives a built plan: ready-node selection and outcomes.
//! - [`group`], [`finalizer`] and [`ordinal`] classify nodes.
//! - [`diagnostics`] carries observer events out of the planning phase.

pub mod builder;
pub mod diagnostics;
pub mod finalizer;
pub mod graph;
pub mod group;
pub mod node;
pub mod ordinal;
pub mod state;
pub mod task_node;

pub use builder::PlanBuilder;
pub use diagnostics::{DiagnosticEvent, DiagnosticSink, LifecycleHook, RecordingSink, TracingSink};
pub use finalizer::{FinalizerGroup, FinalizerGroupId};
pub use graph::ExecutionGraph;
pub use group::{NodeGroup, OrdinalGroup};
pub use node::{Node, NodeKind};
pub use ordinal::{OrdinalNode, OrdinalNodeAccess};
pub use state::{ExecutionPlan, PlanOutcome};
pub use task_node::{TaskNode, TaskSpec};
