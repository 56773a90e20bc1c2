//! Tasks offered to projects that declare none

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use taskdeck_core::HookError;
use taskdeck_prompts::{PromptDefinition, PromptKind};

use crate::extension::{BeforeRunContext, TaskExtension};
use crate::task::{TaskDescriptor, TaskLogKind};

pub const DEPLOY_BETA: &str = "deploy-beta";
pub const DEPLOY_PROD: &str = "deploy-prod";

const DEPLOY_VIEW: &str = "taskdeck.views.dashboard";

/// The default task set: a beta deployment and a production release
pub fn default_tasks() -> Vec<TaskDescriptor> {
    vec![
        TaskDescriptor::new(DEPLOY_BETA, "ewan beta")
            .with_description("Deploy the project to the beta environment")
            .with_default_view(DEPLOY_VIEW)
            .with_need_history(true)
            .with_extension(DeployBeta),
        TaskDescriptor::new(DEPLOY_PROD, "ewan release")
            .with_description("Release the project to production")
            .with_default_view(DEPLOY_VIEW)
            .with_need_history(true)
            .with_prompt(
                PromptDefinition::new("msg", PromptKind::Input)
                    .with_description("Release message"),
            )
            .with_extension(DeployProd),
    ]
}

struct DeployBeta;

#[async_trait]
impl TaskExtension for DeployBeta {
    async fn on_before_run(&self, ctx: &mut BeforeRunContext) -> Result<(), HookError> {
        ctx.args.push("--mode beta");
        ctx.args.push(format!("--label {}", ctx.label));
        Ok(())
    }
}

struct DeployProd;

#[async_trait]
impl TaskExtension for DeployProd {
    async fn on_before_run(&self, ctx: &mut BeforeRunContext) -> Result<(), HookError> {
        let message = ctx
            .answers
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or_default();
        ctx.args.push("--mode production");
        ctx.args.push(format!("--message {}", message));

        // Annotate the log with the commit being released, without holding up the run.
        if let Some(scm) = ctx.scm.clone() {
            let project = ctx.project.clone();
            let logger = ctx.logger.clone();
            tokio::spawn(async move {
                match scm.branches(&project).await {
                    Ok(branches) => {
                        if let Some(branch) = branches.into_iter().find(|b| b.current) {
                            logger.log(
                                TaskLogKind::Stdout,
                                format!("Last commit: {} {}\n", branch.commit, branch.label),
                            );
                        }
                    }
                    Err(e) => debug!(project = %project.id, error = %e, "branch lookup failed"),
                }
            });
        }
        Ok(())
    }
}
