//! Output formatting utilities

use console::{style, Style};

use taskdeck_tasks::{ConsoleLog, ConsoleLogKind, TaskLog, TaskLogKind, TaskStatus};

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("{} {}", style("!").yellow().bold(), message);
}

/// Print an info message
pub fn info(message: &str) {
    println!("{} {}", style("→").blue(), message);
}

/// Create a styled header
pub fn header(text: &str) -> String {
    style(text).bold().to_string()
}

/// Create a styled key-value line
pub fn key_value(key: &str, value: &str) -> String {
    format!("  {}: {}", style(key).dim(), value)
}

/// Style for a task status
pub fn status_style(status: TaskStatus) -> Style {
    match status {
        TaskStatus::Idle => Style::new().dim(),
        TaskStatus::Running => Style::new().blue().bold(),
        TaskStatus::Done => Style::new().green(),
        TaskStatus::Error => Style::new().red().bold(),
        TaskStatus::Terminated => Style::new().yellow(),
    }
}

/// Style for paths
pub fn path_style() -> Style {
    Style::new().cyan()
}

/// Write a task log entry as it arrives. Output chunks keep their own line breaks.
pub fn task_log(log: &TaskLog) {
    match log.kind {
        TaskLogKind::Stdout => print!("{}", log.text),
        TaskLogKind::Stderr => eprint!("{}", log.text),
        TaskLogKind::Info => println!("{}", style(&log.text).dim()),
        TaskLogKind::Error => eprintln!("{}", style(&log.text).red()),
    }
}

/// Print a console entry of the engine
pub fn console_log(log: &ConsoleLog) {
    match log.kind {
        ConsoleLogKind::Done => success(&log.message),
        ConsoleLogKind::Error => error(&log.message),
        ConsoleLogKind::Warn => warning(&log.message),
        ConsoleLogKind::Info => info(&log.message),
    }
}
