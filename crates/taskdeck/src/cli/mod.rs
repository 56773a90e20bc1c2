//! CLI definition and command handling

pub mod commands;
pub mod context;
pub mod output;

use clap::{Parser, Subcommand};

use commands::{
    CompletionsCommand, ConfigCommand, HistoryCommand, InitCommand, PromptsCommand, RunCommand,
    TasksCommand,
};

use crate::exit_codes;

/// taskdeck - run and watch project tasks
#[derive(Debug, Parser)]
#[command(name = "taskdeck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Working directory
    #[arg(short = 'C', long, global = true)]
    pub directory: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

/// Available commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a taskdeck configuration
    Init(InitCommand),

    /// List the tasks of a project
    Tasks(TasksCommand),

    /// Show the parameters of a task
    Prompts(PromptsCommand),

    /// Run a task and stream its output
    Run(RunCommand),

    /// Show the run history of a task
    History(HistoryCommand),

    /// Show the effective configuration
    Config(ConfigCommand),

    /// Generate shell completions
    Completions(CompletionsCommand),
}

impl Cli {
    /// Execute the CLI command, returning the process exit code
    pub fn execute(self) -> anyhow::Result<i32> {
        // Change to specified directory if provided
        if let Some(dir) = &self.directory {
            std::env::set_current_dir(dir)?;
        }

        match self.command {
            Commands::Run(ref cmd) => cmd.execute(&self),
            Commands::Init(ref cmd) => cmd.execute(&self).map(|_| exit_codes::SUCCESS),
            Commands::Tasks(ref cmd) => cmd.execute(&self).map(|_| exit_codes::SUCCESS),
            Commands::Prompts(ref cmd) => cmd.execute(&self).map(|_| exit_codes::SUCCESS),
            Commands::History(ref cmd) => cmd.execute(&self).map(|_| exit_codes::SUCCESS),
            Commands::Config(ref cmd) => cmd.execute(&self).map(|_| exit_codes::SUCCESS),
            Commands::Completions(ref cmd) => cmd.execute(&self).map(|_| exit_codes::SUCCESS),
        }
    }
}
