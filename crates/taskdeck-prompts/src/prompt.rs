//! Prompt declarations and their computed state

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use taskdeck_core::config::{ChoiceConfig, PromptConfig};

use crate::answers::Answers;
use crate::source::{Filter, Source, Transformer, Validator};

/// Kind of input a prompt asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptKind {
    Input,
    Number,
    Confirm,
    List,
    Rawlist,
    Expand,
    Checkbox,
    Password,
    Editor,
}

impl PromptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Number => "number",
            Self::Confirm => "confirm",
            Self::List => "list",
            Self::Rawlist => "rawlist",
            Self::Expand => "expand",
            Self::Checkbox => "checkbox",
            Self::Password => "password",
            Self::Editor => "editor",
        }
    }

    /// Kinds whose choices carry an `is_default` marker
    pub fn is_single_select(&self) -> bool {
        matches!(self, Self::List | Self::Rawlist)
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PromptKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "input" => Ok(Self::Input),
            "number" => Ok(Self::Number),
            "confirm" => Ok(Self::Confirm),
            "list" => Ok(Self::List),
            "rawlist" => Ok(Self::Rawlist),
            "expand" => Ok(Self::Expand),
            "checkbox" => Ok(Self::Checkbox),
            "password" => Ok(Self::Password),
            "editor" => Ok(Self::Editor),
            _ => Err(format!("Unknown prompt kind: {}", s)),
        }
    }
}

/// A declared choice of a list or checkbox prompt
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceDefinition {
    pub value: Value,
    pub name: Option<String>,
    pub checked: bool,
    pub disabled: bool,
}

impl ChoiceDefinition {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            name: None,
            checked: false,
            disabled: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

impl From<&ChoiceConfig> for ChoiceDefinition {
    fn from(config: &ChoiceConfig) -> Self {
        Self {
            value: config.value.clone(),
            name: config.name.clone(),
            checked: config.checked,
            disabled: config.disabled,
        }
    }
}

/// Declaration of a prompt
#[derive(Debug, Clone)]
pub struct PromptDefinition {
    /// Prompt id, unique within a task (dotted paths address nested answers)
    pub name: String,
    pub kind: PromptKind,
    pub message: Option<String>,
    /// Short display name
    pub short: Option<String>,
    pub description: Option<String>,
    pub group: Option<String>,
    pub link: Option<String>,
    pub tab_id: Option<String>,
    /// Explicit value, preferred over `default`
    pub value: Option<Value>,
    pub default: Option<Source<Value>>,
    /// Initial state of confirm prompts
    pub checked: bool,
    /// Visibility predicate
    pub when: Source<bool>,
    pub choices: Option<Source<Vec<ChoiceDefinition>>>,
    pub validate: Option<Validator>,
    pub filter: Option<Filter>,
    pub transformer: Option<Transformer>,
}

impl PromptDefinition {
    /// Create a visible prompt with no hooks
    pub fn new(name: impl Into<String>, kind: PromptKind) -> Self {
        Self {
            name: name.into(),
            kind,
            message: None,
            short: None,
            description: None,
            group: None,
            link: None,
            tab_id: None,
            value: None,
            default: None,
            checked: false,
            when: Source::constant(true),
            choices: None,
            validate: None,
            filter: None,
            transformer: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_short(mut self, short: impl Into<String>) -> Self {
        self.short = Some(short.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(Source::constant(default.into()));
        self
    }

    /// Default computed from the other answers
    pub fn with_default_fn<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Answers) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Value> + Send + 'static,
    {
        self.default = Some(Source::computed(f));
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn with_when(mut self, visible: bool) -> Self {
        self.when = Source::constant(visible);
        self
    }

    /// Visibility computed from the other answers
    pub fn with_when_fn<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Answers) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = bool> + Send + 'static,
    {
        self.when = Source::computed(f);
        self
    }

    pub fn with_choices(mut self, choices: Vec<ChoiceDefinition>) -> Self {
        self.choices = Some(Source::constant(choices));
        self
    }

    /// Choices computed from the other answers
    pub fn with_choices_fn<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Answers) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Vec<ChoiceDefinition>> + Send + 'static,
    {
        self.choices = Some(Source::computed(f));
        self
    }

    pub fn with_validate(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_transformer(mut self, transformer: Transformer) -> Self {
        self.transformer = Some(transformer);
        self
    }
}

impl TryFrom<&PromptConfig> for PromptDefinition {
    type Error = String;

    fn try_from(config: &PromptConfig) -> Result<Self, Self::Error> {
        let kind: PromptKind = config.kind.parse()?;
        let mut definition = PromptDefinition::new(config.name.clone(), kind)
            .with_checked(config.checked)
            .with_when(config.when.unwrap_or(true));
        definition.message = config.message.clone();
        definition.short = config.short.clone();
        definition.description = config.description.clone();
        definition.group = config.group.clone();
        definition.link = config.link.clone();
        definition.tab_id = config.tab_id.clone();
        definition.value = config.value.clone();
        definition.default = config.default.clone().map(Source::constant);
        definition.choices = config
            .choices
            .as_ref()
            .map(|choices| Source::constant(choices.iter().map(ChoiceDefinition::from).collect()));
        Ok(definition)
    }
}

/// A resolved choice as presented to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptChoice {
    /// JSON of the (transformed) choice value
    pub value: String,
    pub name: Option<String>,
    pub checked: bool,
    pub disabled: bool,
    pub is_default: bool,
}

/// Inline validation error of a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptError {
    pub message: String,
}

/// Live state of a prompt after the latest resolution pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptState {
    pub id: String,
    pub kind: PromptKind,
    pub visible: bool,
    pub enabled: bool,
    /// Short display name
    pub name: Option<String>,
    pub message: Option<String>,
    pub group: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub tab_id: Option<String>,
    pub choices: Option<Vec<PromptChoice>>,
    /// JSON of the current value
    pub value: Option<String>,
    pub raw_value: Option<Value>,
    /// Set once the user picked a value; automatic defaults no longer apply
    pub value_changed: bool,
    pub error: Option<PromptError>,
}

impl PromptState {
    /// Fresh state for a newly registered prompt
    pub fn new(definition: &PromptDefinition) -> Self {
        Self {
            id: definition.name.clone(),
            kind: definition.kind,
            visible: true,
            enabled: true,
            name: definition.short.clone(),
            message: definition.message.clone(),
            group: definition.group.clone(),
            description: definition.description.clone(),
            link: definition.link.clone(),
            tab_id: definition.tab_id.clone(),
            choices: None,
            value: None,
            raw_value: None,
            value_changed: false,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_parse_roundtrip() {
        for kind in [
            PromptKind::Input,
            PromptKind::Confirm,
            PromptKind::Checkbox,
            PromptKind::Rawlist,
        ] {
            assert_eq!(kind.as_str().parse::<PromptKind>().unwrap(), kind);
        }
        assert!("slider".parse::<PromptKind>().is_err());
    }

    #[test]
    fn test_single_select_kinds() {
        assert!(PromptKind::List.is_single_select());
        assert!(PromptKind::Rawlist.is_single_select());
        assert!(!PromptKind::Checkbox.is_single_select());
    }

    #[test]
    fn test_definition_from_config() {
        let config = PromptConfig {
            name: "mode".to_string(),
            kind: "list".to_string(),
            message: Some("Mode".to_string()),
            short: None,
            description: None,
            group: Some("build".to_string()),
            link: None,
            tab_id: None,
            default: Some(json!("production")),
            value: None,
            checked: false,
            when: Some(false),
            choices: Some(vec![ChoiceConfig {
                value: json!("production"),
                name: None,
                checked: false,
                disabled: false,
            }]),
        };
        let definition = PromptDefinition::try_from(&config).unwrap();
        assert_eq!(definition.kind, PromptKind::List);
        assert!(matches!(definition.when, Source::Constant(false)));
        assert!(matches!(definition.default, Some(Source::Constant(_))));
        assert_eq!(definition.group.as_deref(), Some("build"));
    }

    #[test]
    fn test_initial_state() {
        let definition = PromptDefinition::new("msg", PromptKind::Input).with_short("Message");
        let state = PromptState::new(&definition);
        assert!(state.visible);
        assert!(state.enabled);
        assert!(!state.value_changed);
        assert_eq!(state.value, None);
        assert_eq!(state.name.as_deref(), Some("Message"));
    }
}
