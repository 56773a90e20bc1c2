//! taskdeck prompts - reactive parameter resolution
//!
//! A task declares prompts (text inputs, confirms, lists, checkboxes...) whose
//! visibility, choices and defaults may depend on the answers given so far.
//! [`PromptEngine`] keeps one prompt set and answer map per task and
//! recomputes them after every change.

pub mod answers;
pub mod engine;
pub mod prompt;
pub mod source;

pub use answers::{is_truthy, Answers};
pub use engine::PromptEngine;
pub use prompt::{
    ChoiceDefinition, PromptChoice, PromptDefinition, PromptError, PromptKind, PromptState,
};
pub use source::{BoxFuture, Filter, Source, Transformer, Validation, Validator};
