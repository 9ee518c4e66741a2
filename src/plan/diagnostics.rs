// src/plan/diagnostics.rs

//! Advisory events raised while the plan is being wired.
//!
//! Edge mutators report through an injected [`DiagnosticSink`] instead of
//! logging directly, so tests can assert on what was reported. None of these
//! events changes the graph.

use std::fmt;
use std::sync::Mutex;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleHook {
    MustRunAfter,
    ShouldRunAfter,
}

impl fmt::Display for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleHook::MustRunAfter => f.write_str("mustRunAfter"),
            LifecycleHook::ShouldRunAfter => f.write_str("shouldRunAfter"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// An ordering hook points at a task owned by another build.
    CrossBuildLifecycleHook {
        hook: LifecycleHook,
        from: String,
        to: String,
        target_build: String,
    },
}

impl fmt::Display for DiagnosticEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticEvent::CrossBuildLifecycleHook {
                hook,
                from,
                to,
                target_build,
            } => write!(
                f,
                "using {hook} to reference tasks from another build is deprecated \
                 ('{from}' -> '{to}' in build '{target_build}')"
            ),
        }
    }
}

pub trait DiagnosticSink: Send + Sync + fmt::Debug {
    fn report(&self, event: DiagnosticEvent);
}

/// Production sink: every event becomes a `warn!` record.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, event: DiagnosticEvent) {
        warn!(%event, "deprecated plan wiring");
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, event: DiagnosticEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
