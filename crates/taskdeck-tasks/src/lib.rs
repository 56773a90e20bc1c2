//! taskdeck tasks - task registry, lifecycle and process supervision
//!
//! [`TaskManager`] is the entry point: it registers the tasks of a project on
//! first access, runs them as shell commands, streams their output into
//! batched log entries and publishes every change on an event bus.

pub mod builtin;
pub mod events;
pub mod extension;
pub mod history;
pub mod log_pipe;
pub mod manager;
pub mod notify;
pub mod registry;
pub mod reporter;
pub mod runner;
pub mod state;
pub mod store;
pub mod task;
pub mod terminate;

#[cfg(test)]
mod test_support;

pub use events::{ConsoleLog, ConsoleLogKind, EventBus, ServerEvent, Subscription};
pub use extension::{ArgList, BeforeRunContext, ExitContext, RunContext, TaskExtension, TaskLogger};
pub use history::{HistoryRecord, HistoryStore};
pub use log_pipe::LogPipe;
pub use manager::{TaskManager, TaskManagerBuilder};
pub use notify::{Badge, BadgeKind, BadgeNotifier, DesktopNotifier, Notification, NotificationIcon, TracingNotifier};
pub use registry::{TaskEntry, TaskRegistry};
pub use reporter::{CollectingReporter, TaskEvent, TaskReporter, TaskReporterRegistry, TracingReporter};
pub use store::{JsonFileStore, MemoryStore, TaskRecord, TaskStore};
pub use task::{TaskDescriptor, TaskId, TaskLog, TaskLogKind, TaskSnapshot, TaskStatus, TaskView};
pub use terminate::{ProcessHandle, ProcessTerminator, TerminateOutcome, Terminator};
