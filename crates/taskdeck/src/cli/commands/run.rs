//! Run command: answer a task's parameters, run it and stream its output

use std::time::Duration;

use anyhow::Context;
use clap::Args;
use dialoguer::{Confirm, Input, MultiSelect, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::{debug, info};

use taskdeck_prompts::{PromptKind, PromptState};
use taskdeck_tasks::{TaskManager, TaskStatus};

use crate::cli::{context, output, Cli, OutputFormat};
use crate::exit_codes;

/// Run a task and stream its output until it exits
#[derive(Debug, Args)]
pub struct RunCommand {
    /// Task id ("project:task")
    pub task: String,

    /// Run label, also used as the history id
    #[arg(long)]
    pub label: Option<String>,

    /// Answer a parameter, as ID=JSON (repeatable)
    #[arg(short = 'a', long = "answer", value_name = "ID=JSON")]
    pub answers: Vec<String>,

    /// Ask for every visible parameter before running
    #[arg(short, long)]
    pub interactive: bool,

    /// Save the answers for the next run
    #[arg(long)]
    pub save: bool,
}

/// Split an `ID=JSON` argument. A value that is not JSON is taken as a string.
fn parse_answer(arg: &str) -> anyhow::Result<(&str, String)> {
    let (id, value) = arg
        .split_once('=')
        .filter(|(id, _)| !id.is_empty())
        .with_context(|| format!("Invalid answer '{}', expected ID=JSON", arg))?;
    if serde_json::from_str::<Value>(value).is_ok() {
        Ok((id, value.to_string()))
    } else {
        Ok((id, Value::String(value.to_string()).to_string()))
    }
}

impl RunCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<i32> {
        info!(task = %self.task, label = ?self.label, "executing run command");
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(self.execute_async(cli))
    }

    async fn execute_async(&self, cli: &Cli) -> anyhow::Result<i32> {
        let (config, _) = context::load_config()?;
        let manager = context::task_manager(&config)?;

        manager
            .task_prompts(&self.task)
            .await
            .ok_or_else(|| anyhow::anyhow!("Unknown task '{}'", self.task))?;

        for arg in &self.answers {
            let (id, value) = parse_answer(arg)?;
            self.answer(&manager, id, &value).await?;
        }
        if self.interactive {
            self.ask(&manager).await?;
        }
        if self.save {
            manager.task_save_parameters(&self.task).await;
            debug!(task = %self.task, "parameters saved");
        }

        let status = self.watch(&manager, cli).await?;
        Ok(match status {
            TaskStatus::Done => exit_codes::SUCCESS,
            TaskStatus::Terminated => exit_codes::CANCELLED,
            _ => exit_codes::TASK_FAILED,
        })
    }

    /// Apply one answer; a validation error aborts the run
    async fn answer(&self, manager: &TaskManager, id: &str, value: &str) -> anyhow::Result<()> {
        let prompts = manager
            .answer_prompt(id, &self.task, value)
            .await
            .ok_or_else(|| anyhow::anyhow!("Unknown parameter '{}' of {}", id, self.task))?;
        if let Some(error) = prompts.iter().find(|p| p.id == id).and_then(|p| p.error.as_ref()) {
            anyhow::bail!("Invalid value for '{}': {}", id, error.message);
        }
        Ok(())
    }

    /// Walk the visible prompts in order. Visibility is re-read after every
    /// answer since it may depend on earlier ones.
    async fn ask(&self, manager: &TaskManager) -> anyhow::Result<()> {
        let mut index = 0;
        loop {
            let prompts = manager.task_prompts(&self.task).await.unwrap_or_default();
            let Some(prompt) = prompts.get(index) else {
                return Ok(());
            };
            index += 1;
            if !prompt.visible || !prompt.enabled {
                continue;
            }

            let value = ask_prompt(prompt)?;
            let states = manager
                .answer_prompt(&prompt.id, &self.task, &value)
                .await
                .unwrap_or_default();
            if let Some(error) = states
                .iter()
                .find(|p| p.id == prompt.id)
                .and_then(|p| p.error.as_ref())
            {
                output::error(&error.message);
                index -= 1;
            }
        }
    }

    /// Run the task and print its output until it leaves `running`
    async fn watch(&self, manager: &TaskManager, cli: &Cli) -> anyhow::Result<TaskStatus> {
        let mut logs = manager.subscribe_task_logs(&self.task);
        let mut changes = manager.subscribe_task_changed();
        let mut console = manager.subscribe_console();
        let json = cli.format == OutputFormat::Json;

        let started = manager
            .task_run(&self.task, self.label.as_deref())
            .await
            .ok_or_else(|| anyhow::anyhow!("Unknown task '{}'", self.task))?;
        if started.status != TaskStatus::Running {
            // Spawn failures end the run before any event could be awaited.
            for log in manager.task_logs(&self.task).unwrap_or_default() {
                output::task_log(&log);
            }
            return Ok(started.status);
        }

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut stopping = None;

        let status = loop {
            tokio::select! {
                biased;
                Some(log) = logs.recv() => {
                    if json {
                        println!("{}", serde_json::to_string(&log)?);
                    } else if !cli.quiet || log.kind == taskdeck_tasks::TaskLogKind::Stderr {
                        output::task_log(&log);
                    }
                }
                Some(entry) = console.recv() => {
                    if !json && !cli.quiet {
                        output::console_log(&entry);
                    }
                }
                Some(task) = changes.recv() => {
                    if task.id == started.id && !task.status.is_running() {
                        break task.status;
                    }
                }
                _ = &mut ctrl_c, if stopping.is_none() => {
                    stopping = Some(spinner(&format!("Stopping {}...", self.task)));
                    manager.task_stop(&self.task).await;
                }
                else => break manager
                    .task(&self.task)
                    .map(|t| t.status)
                    .unwrap_or(TaskStatus::Error),
            }
        };

        if let Some(spinner) = stopping {
            spinner.finish_and_clear();
        }
        // Let the final console entry through
        if let Ok(Some(entry)) = tokio::time::timeout(Duration::from_millis(50), console.recv()).await {
            if !json && !cli.quiet {
                output::console_log(&entry);
            }
        }
        Ok(status)
    }
}

fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.yellow} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn current<'a>(prompt: &'a PromptState) -> Option<&'a Value> {
    prompt.raw_value.as_ref()
}

/// Ask one prompt on the terminal and return the answer as JSON text
fn ask_prompt(prompt: &PromptState) -> anyhow::Result<String> {
    let label = prompt
        .message
        .clone()
        .or_else(|| prompt.name.clone())
        .unwrap_or_else(|| prompt.id.clone());

    let value = match prompt.kind {
        PromptKind::Confirm => {
            let default = current(prompt).and_then(Value::as_bool).unwrap_or(false);
            Value::Bool(
                Confirm::new()
                    .with_prompt(label)
                    .default(default)
                    .interact()?,
            )
        }
        PromptKind::List | PromptKind::Rawlist | PromptKind::Expand => {
            let choices = prompt.choices.clone().unwrap_or_default();
            if choices.is_empty() {
                anyhow::bail!("Parameter '{}' has no choices", prompt.id);
            }
            let names: Vec<_> = choices
                .iter()
                .map(|c| c.name.clone().unwrap_or_else(|| c.value.clone()))
                .collect();
            let default = choices
                .iter()
                .position(|c| c.is_default || Some(&c.value) == prompt.value.as_ref())
                .unwrap_or(0);
            let selection = Select::new()
                .with_prompt(label)
                .items(&names)
                .default(default)
                .interact()?;
            return Ok(choices[selection].value.clone());
        }
        PromptKind::Checkbox => {
            let choices = prompt.choices.clone().unwrap_or_default();
            let selected: Vec<Value> = current(prompt)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let items: Vec<_> = choices
                .iter()
                .map(|c| {
                    let value: Value = serde_json::from_str(&c.value).unwrap_or(Value::Null);
                    let name = c.name.clone().unwrap_or_else(|| c.value.clone());
                    (name, selected.contains(&value))
                })
                .collect();
            let picked = MultiSelect::new()
                .with_prompt(label)
                .items_checked(&items.iter().map(|(n, c)| (n.as_str(), *c)).collect::<Vec<_>>())
                .interact()?;
            Value::Array(
                picked
                    .into_iter()
                    .filter_map(|i| serde_json::from_str(&choices[i].value).ok())
                    .collect(),
            )
        }
        PromptKind::Password => Value::String(Password::new().with_prompt(label).interact()?),
        PromptKind::Number => {
            let default = current(prompt).map(|v| v.to_string()).unwrap_or_default();
            let text: String = Input::new()
                .with_prompt(label)
                .default(default)
                .validate_with(|input: &String| -> Result<(), &str> {
                    input
                        .trim()
                        .parse::<f64>()
                        .map(|_| ())
                        .map_err(|_| "Not a number")
                })
                .interact_text()?;
            return Ok(text.trim().to_string());
        }
        PromptKind::Input | PromptKind::Editor => {
            let default = current(prompt)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let text: String = Input::new()
                .with_prompt(label)
                .default(default)
                .allow_empty(true)
                .interact_text()?;
            Value::String(text)
        }
    };
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer_json() {
        assert_eq!(parse_answer("count=3").unwrap(), ("count", "3".to_string()));
        assert_eq!(
            parse_answer("flags=[\"a\",\"b\"]").unwrap(),
            ("flags", "[\"a\",\"b\"]".to_string())
        );
    }

    #[test]
    fn test_parse_answer_plain_text() {
        assert_eq!(
            parse_answer("msg=hot fix").unwrap(),
            ("msg", "\"hot fix\"".to_string())
        );
        assert_eq!(parse_answer("msg=").unwrap(), ("msg", "\"\"".to_string()));
    }

    #[test]
    fn test_parse_answer_requires_id() {
        assert!(parse_answer("=3").is_err());
        assert!(parse_answer("nothing").is_err());
    }
}
