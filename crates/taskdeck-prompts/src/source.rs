//! Constant-or-computed values used by prompt declarations

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::answers::Answers;

/// Boxed future returned by computed hooks
pub type BoxFuture<T> = futures::future::BoxFuture<'static, T>;

type ComputeFn<T> = Arc<dyn Fn(Answers) -> BoxFuture<T> + Send + Sync>;

/// A declaration field that is either a constant or computed from the current answers
pub enum Source<T> {
    /// Fixed value
    Constant(T),
    /// Computed (possibly asynchronously) from a snapshot of the answers
    Computed(ComputeFn<T>),
}

impl<T> Source<T>
where
    T: Clone + Send + 'static,
{
    /// Wrap a constant
    pub fn constant(value: T) -> Self {
        Self::Constant(value)
    }

    /// Wrap an async computation over the answers
    pub fn computed<F, Fut>(f: F) -> Self
    where
        F: Fn(Answers) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        Self::Computed(Arc::new(move |answers| Box::pin(f(answers))))
    }

    /// Evaluate against the current answers
    pub async fn evaluate(&self, answers: &Answers) -> T {
        match self {
            Self::Constant(value) => value.clone(),
            Self::Computed(f) => f(answers.clone()).await,
        }
    }

    /// Whether the value is computed
    pub fn is_computed(&self) -> bool {
        matches!(self, Self::Computed(_))
    }
}

impl<T: Clone> Clone for Source<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Constant(value) => Self::Constant(value.clone()),
            Self::Computed(f) => Self::Computed(f.clone()),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Source<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Outcome of a prompt validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Validation {
    /// Input accepted
    Valid,
    /// Input rejected with a message for the user
    Message(String),
    /// Input rejected without a message
    Rejected,
}

impl Validation {
    /// Message shown to the user, `None` when valid
    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Valid => None,
            Self::Message(message) => Some(message.clone()),
            Self::Rejected => Some("Invalid input".to_string()),
        }
    }
}

impl From<bool> for Validation {
    fn from(valid: bool) -> Self {
        if valid {
            Self::Valid
        } else {
            Self::Rejected
        }
    }
}

/// Validates raw input against the current answers
#[derive(Clone)]
pub struct Validator(Arc<dyn Fn(Value, Answers) -> BoxFuture<Validation> + Send + Sync>);

impl Validator {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, Answers) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Validation> + Send + 'static,
    {
        Self(Arc::new(move |value, answers| Box::pin(f(value, answers))))
    }

    pub async fn run(&self, value: &Value, answers: &Answers) -> Validation {
        (self.0)(value.clone(), answers.clone()).await
    }
}

/// Maps a displayed value to the value stored in the answers
#[derive(Clone)]
pub struct Filter(Arc<dyn Fn(Value) -> BoxFuture<Value> + Send + Sync>);

impl Filter {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Value> + Send + 'static,
    {
        Self(Arc::new(move |value| Box::pin(f(value))))
    }

    pub async fn run(&self, value: Value) -> Value {
        (self.0)(value).await
    }
}

/// Maps a stored answer (or a choice value) back to its displayed form
#[derive(Clone)]
pub struct Transformer(Arc<dyn Fn(Value, Answers) -> BoxFuture<Value> + Send + Sync>);

impl Transformer {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Value, Answers) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Value> + Send + 'static,
    {
        Self(Arc::new(move |value, answers| Box::pin(f(value, answers))))
    }

    pub async fn run(&self, value: Value, answers: &Answers) -> Value {
        (self.0)(value, answers.clone()).await
    }
}

macro_rules! opaque_debug {
    ($($name:ident),*) => {
        $(impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($name), "(..)"))
            }
        })*
    };
}

opaque_debug!(Validator, Filter, Transformer);
