// src/types.rs

//! Small value types shared by the plan, the executor and the config layer.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Stable handle of a node in the execution graph arena.
///
/// Indices are handed out in discovery order and never reused, so the index
/// doubles as the deterministic sequence key used by every ordered edge set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle of a node.
///
/// `Pending -> Executing -> {Succeeded, Failed}` for nodes that run,
/// `Pending -> Skipped` for nodes that are never offered, and `NotRequired`
/// for nodes that were discovered but are not part of the requested work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    NotRequired,
    Pending,
    Executing,
    Succeeded,
    Failed,
    Skipped,
}

impl ExecutionState {
    pub fn is_required(self) -> bool {
        !matches!(self, ExecutionState::NotRequired)
    }

    pub fn is_complete(self) -> bool {
        matches!(
            self,
            ExecutionState::NotRequired
                | ExecutionState::Succeeded
                | ExecutionState::Failed
                | ExecutionState::Skipped
        )
    }

    /// The node was attempted, whatever the result.
    pub fn is_executed(self) -> bool {
        matches!(self, ExecutionState::Succeeded | ExecutionState::Failed)
    }

    pub fn is_successful(self) -> bool {
        matches!(self, ExecutionState::Succeeded | ExecutionState::NotRequired)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionState::Succeeded | ExecutionState::Failed | ExecutionState::Skipped
        )
    }
}

/// Which side of a location barrier an ordinal node stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OrdinalType {
    Destroyer,
    Producer,
}

impl fmt::Display for OrdinalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrdinalType::Destroyer => f.write_str("destroyer"),
            OrdinalType::Producer => f.write_str("producer"),
        }
    }
}

/// Failure captured on a node after it ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFailure {
    pub message: String,
}

impl NodeFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for NodeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result reported by an execution context for one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(NodeFailure),
    /// The executor declined to run the node. Dependents are skipped too.
    Skipped,
}

/// Simulated outcome declared in a plan file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclaredOutcome {
    Success,
    Failure,
    Skipped,
}

impl Default for DeclaredOutcome {
    fn default() -> Self {
        DeclaredOutcome::Success
    }
}

impl FromStr for DeclaredOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "success" => Ok(DeclaredOutcome::Success),
            "failure" | "failed" => Ok(DeclaredOutcome::Failure),
            "skipped" => Ok(DeclaredOutcome::Skipped),
            other => Err(format!(
                "invalid outcome: {other} (expected \"success\", \"failure\" or \"skipped\")"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executed_covers_both_outcomes_but_not_skipped() {
        assert!(ExecutionState::Succeeded.is_executed());
        assert!(ExecutionState::Failed.is_executed());
        assert!(!ExecutionState::Skipped.is_executed());
        assert!(!ExecutionState::NotRequired.is_executed());
    }

    #[test]
    fn not_required_counts_as_complete_and_successful() {
        let state = ExecutionState::NotRequired;
        assert!(state.is_complete());
        assert!(state.is_successful());
        assert!(!state.is_required());
    }

    #[test]
    fn failed_is_complete_but_not_successful() {
        assert!(ExecutionState::Failed.is_complete());
        assert!(!ExecutionState::Failed.is_successful());
        assert!(!ExecutionState::Executing.is_complete());
    }

    #[test]
    fn large_indices_map_to_distinct_ids() {
        let a = NodeId::from_index(usize::MAX - 1);
        let b = NodeId::from_index(usize::MAX);
        assert_ne!(a, b);
        assert_eq!(b.index(), usize::MAX);
    }

    #[test]
    fn declared_outcome_parses_aliases() {
        assert_eq!("Failed".parse::<DeclaredOutcome>(), Ok(DeclaredOutcome::Failure));
        assert!("maybe".parse::<DeclaredOutcome>().is_err());
    }
}
