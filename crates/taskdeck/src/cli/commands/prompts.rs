//! Prompts command

use clap::Args;
use console::style;
use tracing::info;

use taskdeck_prompts::PromptState;

use crate::cli::{context, output, Cli, OutputFormat};

/// Show the parameters of a task, as resolved from the saved answers
#[derive(Debug, Args)]
pub struct PromptsCommand {
    /// Task id ("project:task")
    pub task: String,
}

impl PromptsCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(task = %self.task, "executing prompts command");
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<()> {
        let (config, _) = context::load_config()?;
        let manager = context::task_manager(&config)?;
        let prompts = manager
            .task_prompts(&self.task)
            .await
            .ok_or_else(|| anyhow::anyhow!("Unknown task '{}'", self.task))?;

        match cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&prompts)?),
            OutputFormat::Text => {
                if prompts.is_empty() {
                    output::info(&format!("{} has no parameters", self.task));
                    return Ok(());
                }
                println!("{}", output::header(&format!("Parameters of {}", self.task)));
                println!();
                for prompt in prompts.iter().filter(|p| p.visible || cli.verbose) {
                    print_prompt(prompt);
                }
            }
        }
        Ok(())
    }
}

fn print_prompt(prompt: &PromptState) {
    let value = prompt.value.as_deref().unwrap_or("-");
    let label = prompt.message.as_deref().unwrap_or(&prompt.id);
    println!(
        "  {} {} = {}",
        style(&prompt.id).bold(),
        style(format!("({})", prompt.kind)).dim(),
        style(value).green()
    );
    if label != prompt.id {
        println!("    {}", style(label).dim());
    }
    if let Some(choices) = &prompt.choices {
        let names: Vec<_> = choices
            .iter()
            .map(|c| c.name.clone().unwrap_or_else(|| c.value.clone()))
            .collect();
        println!("{}", output::key_value("choices", &names.join(", ")));
    }
    if let Some(error) = &prompt.error {
        println!("    {}", style(&error.message).red());
    }
}
