//! Process runner: spawns a task's command and supervises it until exit

use std::io;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{Local, Utc};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use taskdeck_core::Project;
use taskdeck_prompts::{is_truthy, Answers};

use crate::events::ConsoleLogKind;
use crate::extension::{ArgList, BeforeRunContext, ExitContext, RunContext, TaskLogger};
use crate::history::generate_run_id;
use crate::log_pipe::LogPipe;
use crate::manager::Shared;
use crate::notify::{Notification, NotificationIcon};
use crate::registry::TaskEntry;
use crate::reporter::TaskEvent;
use crate::state::update_status;
use crate::task::{TaskLogKind, TaskStatus};
use crate::terminate::{ProcessHandle, TerminateOutcome};

/// Answer that turns off duplicate-flag suppression
pub const OVERRIDE_ARGS: &str = "$_overrideArgs";

/// Directory of the project, exported to the command
pub const CONTEXT_ENV: &str = "TASKDECK_CONTEXT";

/// Id of the project, exported to the command
pub const PROJECT_ID_ENV: &str = "TASKDECK_PROJECT_ID";

/// Split a command template on whitespace. Quoted sections stay in one
/// token, quotes included, so the shell sees them unchanged.
pub fn split_command(template: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote = None;

    for c in template.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c == '"' || c == '\'' => {
                current.push(c);
                quote = Some(c);
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Whether a spawn error is the Windows race where the handle reports
/// "not found" for a process that did start
pub fn spawn_error_is_terminated(
    kind: io::ErrorKind,
    elapsed: Duration,
    grace: Duration,
    windows: bool,
) -> bool {
    windows && kind == io::ErrorKind::NotFound && elapsed <= grace
}

/// Seconds rounded to two decimals
pub fn format_seconds(duration: Duration) -> String {
    let seconds = (duration.as_millis() as f64 / 10.0).round() / 100.0;
    format!("{}", seconds)
}

fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

fn shell_command(line: &str) -> Command {
    #[cfg(windows)]
    {
        let mut command = Command::new("cmd");
        command.args(["/C", line]);
        command
    }
    #[cfg(not(windows))]
    {
        let mut command = Command::new("sh");
        command.args(["-c", line]);
        command
    }
}

#[cfg(unix)]
fn exit_signal(status: &ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &ExitStatus) -> Option<i32> {
    None
}

fn lock(pipe: &Mutex<LogPipe>) -> MutexGuard<'_, LogPipe> {
    pipe.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What the supervisor needs to finish a run
struct RunInfo {
    project: Project,
    program: String,
    args: Vec<String>,
    answers: Answers,
    generation: u64,
    started: Instant,
}

/// Exclusive right to start the next run of a task. Released on drop.
struct StartClaim<'a> {
    entry: &'a TaskEntry,
}

impl<'a> StartClaim<'a> {
    fn acquire(entry: &'a TaskEntry) -> Option<Self> {
        let mut runtime = entry.runtime();
        if runtime.status.is_running() || runtime.starting {
            return None;
        }
        runtime.starting = true;
        runtime.terminating = false;
        Some(Self { entry })
    }
}

impl Drop for StartClaim<'_> {
    fn drop(&mut self) {
        self.entry.runtime().starting = false;
    }
}

/// Start a run of `entry`. Returns whether a process was spawned.
pub(crate) async fn run(shared: Arc<Shared>, entry: Arc<TaskEntry>, label: Option<String>) -> bool {
    let key = entry.key().to_string();
    let project = match shared.projects.find(&entry.id().project) {
        Some(project) => project,
        None => {
            warn!(task = %key, project = %entry.id().project, "project not found");
            return false;
        }
    };
    let Some(claim) = StartClaim::acquire(&entry) else {
        debug!(task = %key, "task already running");
        return false;
    };

    shared.ensure_prompts(&entry).await;
    let answers = shared.prompts.answers(&key).await;

    let mut parts = split_command(&entry.descriptor().command);
    if parts.is_empty() {
        shared.add_log(&entry, TaskLogKind::Error, format!("Task {} has no command", key));
        return false;
    }
    let program = parts.remove(0);

    if shared.config.pull_before_run {
        if let Some(scm) = &shared.scm {
            if let Err(e) = scm.pull(project.repo.as_deref(), &project.path).await {
                shared.add_log(&entry, TaskLogKind::Stdout, e.to_string());
            }
        }
    }

    let label = label
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| generate_run_id(Local::now()));
    let dedupe = !answers.get(OVERRIDE_ARGS).map(is_truthy).unwrap_or(false);
    let mut args = ArgList::new(parts, dedupe);

    let extension = entry.descriptor().extension.clone();
    if let Some(extension) = &extension {
        let mut ctx = BeforeRunContext {
            task_id: key.clone(),
            project: project.clone(),
            label: label.clone(),
            answers: answers.clone(),
            args,
            scm: shared.scm.clone(),
            logger: TaskLogger::new(shared.clone(), entry.clone()),
        };
        if let Err(e) = extension.on_before_run(&mut ctx).await {
            warn!(task = %key, error = %e, "on_before_run hook failed");
        }
        args = ctx.args;
    }
    let args = args.into_vec();
    let line = command_line(&program, &args);
    info!(task = %key, "Task run {}", line);

    if entry.descriptor().need_history {
        if let Err(e) = shared.history.add(&key, &label).await {
            warn!(task = %key, error = %e, "failed to add history entry");
        }
    }

    let generation = {
        let mut runtime = entry.runtime();
        runtime.generation += 1;
        runtime.run_id = Some(label);
        runtime.generation
    };
    let running = update_status(&shared, &entry, TaskStatus::Running, Some(generation)).await;
    drop(claim);
    if !running {
        return false;
    }
    shared.console(format!("Task {} started", key), ConsoleLogKind::Info);
    shared.add_log(&entry, TaskLogKind::Info, format!("$ {}", line));

    let started = Instant::now();
    {
        let mut runtime = entry.runtime();
        runtime.started = Some(started);
        runtime.started_at = Some(Utc::now());
    }

    let mut command = shell_command(&line);
    command
        .current_dir(&project.path)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env("FORCE_COLOR", "1")
        .env(CONTEXT_ENV, &project.path)
        .env(PROJECT_ID_ENV, &project.id);
    if let Some(var) = &shared.config.build_mode_env {
        command.env_remove(var);
    }
    #[cfg(unix)]
    command.process_group(0);

    let run = RunInfo {
        project,
        program,
        args,
        answers,
        generation,
        started,
    };

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            handle_spawn_error(&shared, &entry, run, e).await;
            return false;
        }
    };

    let pid = child.id();
    let (exited_tx, exited_rx) = watch::channel(false);
    if let Some(pid) = pid {
        entry.runtime().process = Some(ProcessHandle::new(pid, exited_rx));
    }

    let out_pipe = Arc::new(Mutex::new(LogPipe::from_config(&shared.config)));
    let err_pipe = Arc::new(Mutex::new(LogPipe::from_config(&shared.config)));
    let mut readers = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        readers.push(tokio::spawn(pump(
            stdout,
            out_pipe.clone(),
            shared.clone(),
            entry.clone(),
            TaskLogKind::Stdout,
        )));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(tokio::spawn(pump(
            stderr,
            err_pipe.clone(),
            shared.clone(),
            entry.clone(),
            TaskLogKind::Stderr,
        )));
    }

    if let Some(extension) = &extension {
        let ctx = RunContext {
            task_id: key.clone(),
            project: run.project.clone(),
            args: run.args.clone(),
            pid,
            cwd: run.project.path.clone(),
        };
        if let Err(e) = extension.on_run(&ctx).await {
            warn!(task = %key, error = %e, "on_run hook failed");
        }
    }
    shared.reporters.broadcast(&TaskEvent::Run {
        id: entry.id().clone(),
        command: run.program.clone(),
        args: run.args.clone(),
        pid,
    });

    tokio::spawn(supervise(
        shared,
        entry,
        child,
        exited_tx,
        readers,
        [(out_pipe, TaskLogKind::Stdout), (err_pipe, TaskLogKind::Stderr)],
        run,
    ));
    true
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Feed one output stream into its pipe until EOF
async fn pump<R>(
    mut reader: R,
    pipe: Arc<Mutex<LogPipe>>,
    shared: Arc<Shared>,
    entry: Arc<TaskEntry>,
    kind: TaskLogKind,
) where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; 8192];
    loop {
        let deadline = lock(&pipe).deadline();
        tokio::select! {
            read = reader.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => {
                    let mut pipe = lock(&pipe);
                    if let Some(text) = pipe.add_bytes(&buf[..n]) {
                        shared.add_log(&entry, kind, text);
                    }
                }
                Err(e) => {
                    debug!(task = entry.key(), error = %e, "output stream closed");
                    break;
                }
            },
            _ = sleep_until_deadline(deadline) => {
                let mut pipe = lock(&pipe);
                if let Some(text) = pipe.flush() {
                    shared.add_log(&entry, kind, text);
                }
            }
        }
    }
}

async fn supervise(
    shared: Arc<Shared>,
    entry: Arc<TaskEntry>,
    mut child: Child,
    exited_tx: watch::Sender<bool>,
    mut readers: Vec<JoinHandle<()>>,
    pipes: [(Arc<Mutex<LogPipe>>, TaskLogKind); 2],
    run: RunInfo,
) {
    let status = child.wait().await;
    let _ = exited_tx.send(true);

    let drain = Duration::from_millis(shared.config.drain_timeout_ms);
    if tokio::time::timeout(drain, futures::future::join_all(readers.iter_mut()))
        .await
        .is_err()
    {
        // A background child still holds the pipe open
        debug!(task = entry.key(), "output still open after exit");
        for reader in &readers {
            reader.abort();
        }
        futures::future::join_all(readers).await;
    }
    for (pipe, kind) in &pipes {
        let mut pipe = lock(pipe);
        if let Some(text) = pipe.finish() {
            shared.add_log(&entry, *kind, text);
        }
    }

    let (code, signal) = match status {
        Ok(status) => (status.code(), exit_signal(&status)),
        Err(e) => {
            warn!(task = entry.key(), error = %e, "failed to wait for process");
            (None, None)
        }
    };
    handle_exit(&shared, &entry, run, code, signal).await;
}

async fn handle_exit(
    shared: &Arc<Shared>,
    entry: &Arc<TaskEntry>,
    run: RunInfo,
    code: Option<i32>,
    signal: Option<i32>,
) {
    let key = entry.key();
    let duration = run.started.elapsed();
    let seconds = format_seconds(duration);
    shared.add_log(entry, TaskLogKind::Info, format!("Total task duration: {}s", seconds));
    info!(task = key, code = ?code, signal = ?signal, "Task exit");

    if let Some(extension) = &entry.descriptor().extension {
        let ctx = ExitContext {
            task_id: key.to_string(),
            project: run.project.clone(),
            args: run.args.clone(),
            answers: run.answers.clone(),
            code,
            signal,
            duration,
        };
        if let Err(e) = extension.on_exit(&ctx).await {
            warn!(task = key, error = %e, "on_exit hook failed");
        }
    }

    let terminating = entry.runtime().terminating;
    let status = match code {
        None => TaskStatus::Terminated,
        Some(_) if terminating => TaskStatus::Terminated,
        Some(0) => TaskStatus::Done,
        Some(_) => TaskStatus::Error,
    };

    if update_status(shared, entry, status, Some(run.generation)).await {
        match status {
            TaskStatus::Done => {
                shared.console(format!("Task {} completed", key), ConsoleLogKind::Done);
                shared.notify(&Notification::new(
                    "Task completed",
                    format!("Task {} completed in {}s.", key, seconds),
                    NotificationIcon::Done,
                ));
            }
            TaskStatus::Error => {
                let message = format!(
                    "Task {} ended with error code {}",
                    key,
                    code.unwrap_or_default()
                );
                shared.console(message.clone(), ConsoleLogKind::Error);
                shared.notify(&Notification::new("Task error", message, NotificationIcon::Error));
            }
            _ => shared.console(format!("Task {} was terminated", key), ConsoleLogKind::Info),
        }
    }

    {
        let mut runtime = entry.runtime();
        if runtime.generation == run.generation {
            runtime.process = None;
        }
    }

    shared.reporters.broadcast(&TaskEvent::Exit {
        id: entry.id().clone(),
        code,
        signal,
        status: entry.status(),
        duration,
    });
}

async fn handle_spawn_error(shared: &Arc<Shared>, entry: &Arc<TaskEntry>, run: RunInfo, e: io::Error) {
    let grace = Duration::from_millis(shared.config.spawn_error_grace_ms);
    if spawn_error_is_terminated(e.kind(), run.started.elapsed(), grace, cfg!(windows)) {
        handle_exit(shared, entry, run, None, None).await;
        return;
    }

    let message = format!(
        "Error while running task {} with message '{}'",
        entry.key(),
        e
    );
    error!(task = entry.key(), error = %e, "failed to spawn task");
    if update_status(shared, entry, TaskStatus::Error, Some(run.generation)).await {
        shared.console(message.clone(), ConsoleLogKind::Error);
        shared.notify(&Notification::new("Task error", message.clone(), NotificationIcon::Error));
    }
    shared.add_log(entry, TaskLogKind::Error, message);
}

/// Stop a running task. Returns whether the task was terminated.
pub(crate) async fn stop(shared: &Shared, entry: &TaskEntry) -> bool {
    let (process, generation) = {
        let mut runtime = entry.runtime();
        if !runtime.status.is_running() {
            return false;
        }
        let process = match &runtime.process {
            Some(process) => process.clone(),
            None => return false,
        };
        runtime.terminating = true;
        (process, runtime.generation)
    };

    match shared
        .terminator
        .terminate(&process, entry.project_path())
        .await
    {
        TerminateOutcome::Success => {
            if update_status(shared, entry, TaskStatus::Terminated, Some(generation)).await {
                shared.console(
                    format!("Task {} was terminated", entry.key()),
                    ConsoleLogKind::Info,
                );
            }
            true
        }
        TerminateOutcome::Failed(reason) => {
            entry.runtime().terminating = false;
            error!(task = entry.key(), %reason, "Can't terminate process {}", process.pid());
            false
        }
    }
}
