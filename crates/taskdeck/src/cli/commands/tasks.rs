//! Tasks command

use clap::Args;
use console::style;
use tracing::info;

use crate::cli::{context, output, Cli, OutputFormat};

/// List the tasks of a project
#[derive(Debug, Args)]
pub struct TasksCommand {
    /// Project id (default: the first configured project)
    pub project: Option<String>,
}

impl TasksCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        let (config, _) = context::load_config()?;
        let project = context::project_id(&config, self.project.as_deref())?;
        info!(project = %project, "executing tasks command");

        let manager = context::task_manager(&config)?;
        let tasks = manager
            .tasks(&project)
            .ok_or_else(|| anyhow::anyhow!("Unknown project '{}'", project))?;

        match cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&tasks)?),
            OutputFormat::Text => {
                println!("{}", output::header(&format!("Tasks of {}", project)));
                println!();
                let width = tasks.iter().map(|t| t.name.len()).max().unwrap_or(0);
                for task in &tasks {
                    println!(
                        "  {}  {}",
                        style(format!("{:width$}", task.name, width = width)).bold(),
                        style(&task.command).cyan(),
                    );
                    if cli.verbose {
                        if let Some(description) = &task.description {
                            println!("{}", output::key_value("description", description));
                        }
                        println!("{}", output::key_value("history", &task.need_history.to_string()));
                    }
                }
            }
        }
        Ok(())
    }
}
