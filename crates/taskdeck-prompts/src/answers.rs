//! Answer maps with dotted-path access

use serde_json::{Map, Value};

/// Answers of one task, keyed by prompt id
pub type Answers = Map<String, Value>;

/// Read the answer at `path` (`a.b` addresses `{"a": {"b": ..}}`)
pub fn get_path<'a>(answers: &'a Answers, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = answers.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write the answer at `path`, creating (or replacing non-object) parents
pub fn set_path(answers: &mut Answers, path: &str, value: Value) {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = match segments.split_last() {
        Some(split) => split,
        None => return,
    };

    let mut current = answers;
    for segment in parents {
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        current = match entry.as_object_mut() {
            Some(map) => map,
            None => return,
        };
    }
    current.insert(last.to_string(), value);
}

/// Remove the answer at `path`. Returns the removed value.
pub fn unset_path(answers: &mut Answers, path: &str) -> Option<Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let (last, parents) = segments.split_last()?;

    let mut current = answers;
    for segment in parents {
        current = current.get_mut(*segment)?.as_object_mut()?;
    }
    current.remove(*last)
}

/// Loose truthiness of a JSON value (`null`, `false`, `0`, `""` are false)
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
