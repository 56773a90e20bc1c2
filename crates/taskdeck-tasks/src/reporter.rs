//! Task lifecycle reporting for external listeners

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::task::{TaskId, TaskStatus};

/// Events emitted after the engine handled a lifecycle step
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// A task's process was spawned
    Run {
        id: TaskId,
        command: String,
        args: Vec<String>,
        pid: Option<u32>,
    },
    /// A task's process exited and the final status was applied
    Exit {
        id: TaskId,
        code: Option<i32>,
        signal: Option<i32>,
        status: TaskStatus,
        duration: Duration,
    },
    /// A client opened a task
    Open { id: TaskId },
}

/// Trait for reporting task lifecycle events
pub trait TaskReporter: Send + Sync {
    /// Handle a task event
    fn report(&self, event: &TaskEvent);
}

/// Simple reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl TaskReporter for TracingReporter {
    fn report(&self, event: &TaskEvent) {
        match event {
            TaskEvent::Run {
                id,
                command,
                args,
                pid,
            } => {
                tracing::info!(pid = ?pid, "Task run {}: {} {}", id, command, args.join(" "));
            }
            TaskEvent::Exit {
                id,
                code,
                signal,
                status,
                duration,
            } => {
                tracing::info!(
                    code = ?code,
                    signal = ?signal,
                    "Task exit {} ({}) after {:.2}s",
                    id,
                    status,
                    duration.as_secs_f64()
                );
            }
            TaskEvent::Open { id } => {
                tracing::debug!("Task open {}", id);
            }
        }
    }
}

/// Reporter that collects events for later inspection (useful for testing)
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<TaskEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<TaskEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TaskReporter for CollectingReporter {
    fn report(&self, event: &TaskEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Registry of task reporters
pub struct TaskReporterRegistry {
    reporters: Vec<Arc<dyn TaskReporter>>,
}

impl TaskReporterRegistry {
    pub fn new() -> Self {
        Self {
            reporters: vec![Arc::new(TracingReporter)],
        }
    }

    pub fn empty() -> Self {
        Self {
            reporters: Vec::new(),
        }
    }

    pub fn register<R: TaskReporter + 'static>(&mut self, reporter: R) {
        self.reporters.push(Arc::new(reporter));
    }

    /// Register a shared reporter
    pub fn register_shared(&mut self, reporter: Arc<dyn TaskReporter>) {
        self.reporters.push(reporter);
    }

    pub fn all(&self) -> &[Arc<dyn TaskReporter>] {
        &self.reporters
    }

    /// Broadcast an event to all registered reporters
    pub fn broadcast(&self, event: &TaskEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}

impl Default for TaskReporterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
