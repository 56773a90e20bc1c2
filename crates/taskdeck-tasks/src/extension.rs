//! Lifecycle hooks a task descriptor may implement

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use taskdeck_core::{HookError, Project, SourceControl};
use taskdeck_prompts::Answers;

use crate::manager::Shared;
use crate::registry::TaskEntry;
use crate::task::TaskLogKind;

/// Flag key of an argument: the first token when it starts with `--`
fn flag_key(arg: &str) -> Option<&str> {
    arg.split_whitespace().next().filter(|t| t.starts_with("--"))
}

/// Command arguments with optional duplicate-flag suppression.
///
/// With suppression on, pushing a flag that is already present replaces the
/// earlier occurrence in place (last value wins, first position kept).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgList {
    args: Vec<String>,
    dedupe: bool,
}

impl ArgList {
    pub fn new(args: Vec<String>, dedupe: bool) -> Self {
        Self { args, dedupe }
    }

    pub fn push(&mut self, arg: impl Into<String>) {
        let arg = arg.into();
        if self.dedupe {
            if let Some(key) = flag_key(&arg).map(str::to_string) {
                if let Some(pos) = self.args.iter().position(|a| flag_key(a) == Some(key.as_str())) {
                    // A bare flag followed by its value is replaced together with the value.
                    let bare = self.args[pos] == key;
                    let has_value = self
                        .args
                        .get(pos + 1)
                        .map(|next| !next.starts_with('-'))
                        .unwrap_or(false);
                    if bare && has_value && arg.contains(char::is_whitespace) {
                        self.args.remove(pos + 1);
                    }
                    self.args[pos] = arg;
                    return;
                }
            }
        }
        self.args.push(arg);
    }

    pub fn as_slice(&self) -> &[String] {
        &self.args
    }

    pub fn into_vec(self) -> Vec<String> {
        self.args
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn contains(&self, arg: &str) -> bool {
        self.args.iter().any(|a| a == arg)
    }
}

/// Appends log lines to a task from inside a hook
#[derive(Clone)]
pub struct TaskLogger {
    shared: Arc<Shared>,
    entry: Arc<TaskEntry>,
}

impl TaskLogger {
    pub(crate) fn new(shared: Arc<Shared>, entry: Arc<TaskEntry>) -> Self {
        Self { shared, entry }
    }

    pub fn log(&self, kind: TaskLogKind, text: impl Into<String>) {
        self.shared.add_log(&self.entry, kind, text);
    }
}

impl fmt::Debug for TaskLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TaskLogger").field(&self.entry.key()).finish()
    }
}

/// Input of [`TaskExtension::on_before_run`]
pub struct BeforeRunContext {
    pub task_id: String,
    pub project: Project,
    /// Run label, also the history run id
    pub label: String,
    pub answers: Answers,
    /// Arguments after the program; hooks may push more
    pub args: ArgList,
    pub scm: Option<Arc<dyn SourceControl>>,
    pub logger: TaskLogger,
}

/// Input of [`TaskExtension::on_run`]
#[derive(Debug, Clone)]
pub struct RunContext {
    pub task_id: String,
    pub project: Project,
    pub args: Vec<String>,
    pub pid: Option<u32>,
    pub cwd: PathBuf,
}

/// Input of [`TaskExtension::on_exit`]
#[derive(Debug, Clone)]
pub struct ExitContext {
    pub task_id: String,
    pub project: Project,
    pub args: Vec<String>,
    pub answers: Answers,
    /// `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub signal: Option<i32>,
    pub duration: Duration,
}

/// Hooks around a task's run. Every method defaults to doing nothing.
#[async_trait]
pub trait TaskExtension: Send + Sync {
    /// Called before spawning; may add arguments
    async fn on_before_run(&self, _ctx: &mut BeforeRunContext) -> Result<(), HookError> {
        Ok(())
    }

    /// Called once the process is spawned
    async fn on_run(&self, _ctx: &RunContext) -> Result<(), HookError> {
        Ok(())
    }

    /// Called after the process exited, before the final status is applied
    async fn on_exit(&self, _ctx: &ExitContext) -> Result<(), HookError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str], dedupe: bool) -> ArgList {
        ArgList::new(list.iter().map(|s| s.to_string()).collect(), dedupe)
    }

    #[test]
    fn test_duplicate_flag_replaced_in_place() {
        let mut list = args(&["beta", "--mode development", "--verbose"], true);
        list.push("--mode production");
        list.push("--label r1");
        assert_eq!(
            list.as_slice(),
            &["beta", "--mode production", "--verbose", "--label r1"]
        );
    }

    #[test]
    fn test_bare_flag_value_replaced() {
        let mut list = args(&["build", "--mode", "dev", "--watch"], true);
        list.push("--mode beta");
        assert_eq!(list.as_slice(), &["build", "--mode beta", "--watch"]);
    }

    #[test]
    fn test_override_keeps_duplicates() {
        let mut list = args(&["--mode dev"], false);
        list.push("--mode beta");
        assert_eq!(list.len(), 2);
        assert!(list.contains("--mode dev"));
    }

    #[test]
    fn test_positionals_never_deduplicated() {
        let mut list = args(&["a"], true);
        list.push("a");
        assert_eq!(list.into_vec(), vec!["a", "a"]);
    }
}
