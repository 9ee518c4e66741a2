// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::types::{ExecutionState, NodeId};

#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Task not found: {0}")]
    UnknownTask(String),

    #[error("Task already added to the plan: {0}")]
    DuplicateTask(String),

    #[error("Node {0} is not part of this graph")]
    UnknownNode(NodeId),

    #[error("Node {0} is not a task node")]
    NotATask(NodeId),

    #[error("Node {0} is not an ordinal node")]
    NotAnOrdinal(NodeId),

    #[error("Cycle detected in execution plan: {0}")]
    Cycle(String),

    #[error("Illegal state transition for node {node}: {from:?} -> {to:?}")]
    IllegalTransition {
        node: NodeId,
        from: ExecutionState,
        to: ExecutionState,
    },

    #[error("Execution failed for task(s): {}", .0.join(", "))]
    TasksFailed(Vec<String>),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PlanError>;
