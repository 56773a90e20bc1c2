//! Config command

use clap::Args;
use console::style;
use tracing::info;

use taskdeck_core::config::validate_config;

use crate::cli::{context, output, Cli, OutputFormat};

/// Show the effective configuration
#[derive(Debug, Args)]
pub struct ConfigCommand {
    /// Only check that the configuration is valid
    #[arg(long)]
    pub check: bool,
}

impl ConfigCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(check = self.check, "executing config command");
        let (config, path) = context::load_config()?;
        validate_config(&config)?;

        if self.check {
            if !cli.quiet {
                output::success("Configuration is valid");
            }
            return Ok(());
        }

        match cli.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "path": path.as_ref().map(|p| p.display().to_string()),
                    "store": context::store_path(&config).map(|p| p.display().to_string()),
                    "config": config,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text => {
                match &path {
                    Some(path) => println!(
                        "{}",
                        output::key_value("Config file", &output::path_style().apply_to(path.display()).to_string())
                    ),
                    None => println!(
                        "{}",
                        output::key_value("Config file", &format!("{} (using defaults)", style("not found").yellow()))
                    ),
                }
                if let Some(store) = context::store_path(&config) {
                    println!("{}", output::key_value("Task database", &store.display().to_string()));
                }
                println!();
                print!("{}", serde_yaml::to_string(&config)?);
            }
        }
        Ok(())
    }
}
