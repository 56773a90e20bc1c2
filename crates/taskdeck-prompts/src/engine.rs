//! Prompt resolution engine
//!
//! One [`TaskPrompts`] slot exists per task id. Every operation that reads or
//! mutates a slot holds its async mutex for the whole operation, so a
//! resolution pass never interleaves with another pass or with an answer
//! update for the same task. Different tasks resolve independently.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::answers::{get_path, is_truthy, set_path, unset_path, Answers};
use crate::prompt::{
    ChoiceDefinition, PromptChoice, PromptDefinition, PromptError, PromptKind, PromptState,
};

struct Prompt {
    definition: Arc<PromptDefinition>,
    state: PromptState,
}

#[derive(Default)]
struct TaskPrompts {
    prompts: Vec<Prompt>,
    answers: Answers,
}

impl TaskPrompts {
    fn states(&self) -> Vec<PromptState> {
        self.prompts.iter().map(|p| p.state.clone()).collect()
    }

    fn position(&self, prompt_id: &str) -> Option<usize> {
        self.prompts.iter().position(|p| p.state.id == prompt_id)
    }
}

/// Owns the prompt sets and answer maps of all tasks
#[derive(Default)]
pub struct PromptEngine {
    tasks: RwLock<HashMap<String, Arc<Mutex<TaskPrompts>>>>,
}

impl PromptEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, task_id: &str) -> Arc<Mutex<TaskPrompts>> {
        if let Ok(tasks) = self.tasks.read() {
            if let Some(slot) = tasks.get(task_id) {
                return slot.clone();
            }
        }
        match self.tasks.write() {
            Ok(mut tasks) => tasks.entry(task_id.to_string()).or_default().clone(),
            // A poisoned map only loses the cache; hand out a detached slot.
            Err(_) => Arc::new(Mutex::new(TaskPrompts::default())),
        }
    }

    fn existing_slot(&self, task_id: &str) -> Option<Arc<Mutex<TaskPrompts>>> {
        self.tasks.read().ok()?.get(task_id).cloned()
    }

    /// Drop all prompts and answers of a task
    pub async fn reset(&self, task_id: &str) {
        let slot = self.slot(task_id);
        let mut set = slot.lock().await;
        set.prompts.clear();
        set.answers.clear();
        debug!(task = task_id, "prompts reset");
    }

    /// Register a prompt at the end of the task's prompt list
    pub async fn add(&self, task_id: &str, definition: PromptDefinition) -> PromptState {
        let slot = self.slot(task_id);
        let mut set = slot.lock().await;
        let state = PromptState::new(&definition);
        set.prompts.push(Prompt {
            definition: Arc::new(definition),
            state: state.clone(),
        });
        state
    }

    /// Run the first resolution pass after the prompts were registered
    pub async fn start(&self, task_id: &str) -> Vec<PromptState> {
        self.resolve(task_id).await
    }

    /// Recompute every prompt of the task from its current answers
    #[instrument(skip(self))]
    pub async fn resolve(&self, task_id: &str) -> Vec<PromptState> {
        let slot = self.slot(task_id);
        let mut set = slot.lock().await;
        resolve_pass(task_id, &mut set).await;
        set.states()
    }

    /// Replace the answers of a task and resolve again. User edits are
    /// discarded so every prompt picks its value from the new answers.
    pub async fn set_answers(&self, task_id: &str, answers: Answers) -> Vec<PromptState> {
        let slot = self.slot(task_id);
        let mut set = slot.lock().await;
        set.answers = answers;
        for prompt in &mut set.prompts {
            prompt.state.value_changed = false;
        }
        resolve_pass(task_id, &mut set).await;
        set.states()
    }

    /// Apply a user-supplied value to one prompt.
    ///
    /// Returns `None` when the task or prompt is unknown. A value rejected by
    /// the validator only records the error on the prompt.
    #[instrument(skip(self, raw))]
    pub async fn set_value(
        &self,
        task_id: &str,
        prompt_id: &str,
        raw: Value,
    ) -> Option<PromptState> {
        let slot = match self.existing_slot(task_id) {
            Some(slot) => slot,
            None => {
                warn!(task = task_id, prompt = prompt_id, "prompt not found");
                return None;
            }
        };
        let mut set = slot.lock().await;
        let index = match set.position(prompt_id) {
            Some(index) => index,
            None => {
                warn!(task = task_id, prompt = prompt_id, "prompt not found");
                return None;
            }
        };

        let definition = set.prompts[index].definition.clone();
        if let Some(validator) = &definition.validate {
            let outcome = validator.run(&raw, &set.answers).await;
            if let Some(message) = outcome.error_message() {
                debug!(task = task_id, prompt = prompt_id, %message, "prompt input rejected");
                let state = &mut set.prompts[index].state;
                state.error = Some(PromptError { message });
                return Some(state.clone());
            }
        }

        let stored = match &definition.filter {
            Some(filter) => filter.run(raw.clone()).await,
            None => raw.clone(),
        };
        {
            let state = &mut set.prompts[index].state;
            state.error = None;
            state.value = serde_json::to_string(&raw).ok();
            state.raw_value = Some(raw);
            state.value_changed = true;
        }
        set_path(&mut set.answers, prompt_id, stored);

        resolve_pass(task_id, &mut set).await;
        Some(set.prompts[index].state.clone())
    }

    /// Transport entry point: `value` is the JSON text sent by the client.
    /// Returns the full prompt list of the task, `None` for unknown ids.
    pub async fn answer_prompt(
        &self,
        task_id: &str,
        prompt_id: &str,
        value: &str,
    ) -> Option<Vec<PromptState>> {
        match serde_json::from_str::<Value>(value) {
            Ok(raw) => {
                self.set_value(task_id, prompt_id, raw).await?;
            }
            Err(e) => {
                let slot = self.existing_slot(task_id)?;
                let mut set = slot.lock().await;
                let index = set.position(prompt_id)?;
                debug!(task = task_id, prompt = prompt_id, error = %e, "unparseable answer");
                set.prompts[index].state.error = Some(PromptError {
                    message: "Invalid input".to_string(),
                });
            }
        }
        self.list(task_id).await
    }

    /// Current prompt states, `None` if the task never registered prompts
    pub async fn list(&self, task_id: &str) -> Option<Vec<PromptState>> {
        let slot = self.existing_slot(task_id)?;
        let set = slot.lock().await;
        Some(set.states())
    }

    /// One prompt's state
    pub async fn find(&self, task_id: &str, prompt_id: &str) -> Option<PromptState> {
        let slot = self.existing_slot(task_id)?;
        let set = slot.lock().await;
        set.prompts
            .iter()
            .find(|p| p.state.id == prompt_id)
            .map(|p| p.state.clone())
    }

    /// Snapshot of the task's answers (empty for unknown tasks)
    pub async fn answers(&self, task_id: &str) -> Answers {
        match self.existing_slot(task_id) {
            Some(slot) => slot.lock().await.answers.clone(),
            None => Answers::new(),
        }
    }

    /// One answer of a task
    pub async fn answer(&self, task_id: &str, prompt_id: &str) -> Option<Value> {
        let answers = self.answers(task_id).await;
        get_path(&answers, prompt_id).cloned()
    }
}

async fn resolve_pass(task_id: &str, set: &mut TaskPrompts) {
    let TaskPrompts { prompts, answers } = set;

    for prompt in prompts.iter_mut() {
        let definition = prompt.definition.clone();
        let was_visible = prompt.state.visible;

        let visible = definition.when.evaluate(answers).await;
        prompt.state.visible = visible;

        let raw_choices = match &definition.choices {
            Some(source) => Some(source.evaluate(answers).await),
            None => None,
        };
        prompt.state.choices = match &raw_choices {
            Some(choices) => Some(resolve_choices(&definition, choices, answers).await),
            None => None,
        };

        if !visible {
            unset_path(answers, &definition.name);
            prompt.state.value = None;
            prompt.state.raw_value = None;
            if was_visible {
                prompt.state.value_changed = false;
            }
            continue;
        }

        if prompt.state.value_changed {
            continue;
        }

        let value = match get_path(answers, &definition.name).cloned() {
            Some(answer) => Some(match &definition.transformer {
                Some(transformer) => transformer.run(answer, answers).await,
                None => answer,
            }),
            None => match &definition.value {
                Some(value) => Some(value.clone()),
                None => default_value(&definition, raw_choices.as_deref(), answers).await,
            },
        };

        match value {
            Some(value) => {
                prompt.state.value = serde_json::to_string(&value).ok();
                prompt.state.raw_value = Some(value.clone());
                let stored = match &definition.filter {
                    Some(filter) => filter.run(value).await,
                    None => value,
                };
                set_path(answers, &definition.name, stored);
            }
            None => {
                prompt.state.value = None;
                prompt.state.raw_value = None;
                unset_path(answers, &definition.name);
            }
        }
    }

    debug!(task = task_id, answers = ?answers, "prompt answers");
}

async fn resolve_choices(
    definition: &PromptDefinition,
    choices: &[ChoiceDefinition],
    answers: &Answers,
) -> Vec<PromptChoice> {
    let default = if definition.kind.is_single_select() {
        default_value(definition, Some(choices), answers).await
    } else {
        None
    };

    let mut resolved = Vec::with_capacity(choices.len());
    for choice in choices {
        let shown = match &definition.transformer {
            Some(transformer) => transformer.run(choice.value.clone(), answers).await,
            None => choice.value.clone(),
        };
        resolved.push(PromptChoice {
            value: serde_json::to_string(&shown).unwrap_or_default(),
            name: choice.name.clone(),
            checked: choice.checked,
            disabled: choice.disabled,
            is_default: default.as_ref() == Some(&choice.value),
        });
    }
    resolved
}

/// Kind-specific default of a prompt
async fn default_value(
    definition: &PromptDefinition,
    choices: Option<&[ChoiceDefinition]>,
    answers: &Answers,
) -> Option<Value> {
    let declared = match &definition.default {
        Some(source) => Some(source.evaluate(answers).await),
        None => None,
    };

    match definition.kind {
        PromptKind::Checkbox => match choices {
            Some(choices) => Some(Value::Array(
                choices
                    .iter()
                    .filter(|c| c.checked)
                    .map(|c| c.value.clone())
                    .collect(),
            )),
            None => declared,
        },
        PromptKind::Confirm => {
            if definition.checked {
                return Some(Value::Bool(true));
            }
            match declared {
                Some(value) if is_truthy(&value) => Some(value),
                _ => Some(Value::Bool(false)),
            }
        }
        _ => declared,
    }
}
