//! CLI commands

mod completions;
mod config;
mod history;
mod init;
mod prompts;
mod run;
mod tasks;

pub use completions::CompletionsCommand;
pub use config::ConfigCommand;
pub use history::HistoryCommand;
pub use init::InitCommand;
pub use prompts::PromptsCommand;
pub use run::RunCommand;
pub use tasks::TasksCommand;
