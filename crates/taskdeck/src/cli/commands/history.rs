//! History command

use clap::Args;
use console::style;
use tracing::info;

use crate::cli::{context, output, Cli, OutputFormat};

/// Show the run history of a task, newest first
#[derive(Debug, Args)]
pub struct HistoryCommand {
    /// Task id ("project:task")
    pub task: String,
}

impl HistoryCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(task = %self.task, "executing history command");
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<()> {
        let (config, _) = context::load_config()?;
        let manager = context::task_manager(&config)?;
        let history = manager
            .task_history(&self.task)
            .await
            .ok_or_else(|| anyhow::anyhow!("Unknown task '{}'", self.task))?;

        match cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&history)?),
            OutputFormat::Text => {
                if history.is_empty() {
                    output::info(&format!("No runs recorded for {}", self.task));
                    return Ok(());
                }
                println!("{}", output::header(&format!("History of {}", self.task)));
                println!();
                for record in &history {
                    let status = match record.status {
                        Some(status) => output::status_style(status).apply_to(status.to_string()),
                        None => style("unknown".to_string()).dim(),
                    };
                    print!("  {}  {}", style(&record.id).bold(), status);
                    match record.homepage.as_deref().filter(|h| !h.is_empty()) {
                        Some(homepage) => println!("  {}", output::path_style().apply_to(homepage)),
                        None => println!(),
                    }
                }
            }
        }
        Ok(())
    }
}
