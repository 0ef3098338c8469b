use serde_json::{Map, Value};

use super::path::get_path;

/// The trimmed path inside a `{{path}}` placeholder, if `s` is one.
pub fn placeholder_path(s: &str) -> Option<&str> {
    if s.len() >= 4 && s.starts_with("{{") && s.ends_with("}}") {
        Some(s[2..s.len() - 2].trim())
    } else {
        None
    }
}

/// Build a request body from `template`, resolving placeholders against `bundle`.
///
/// Only object values are placeholders: each becomes the resolved value, or
/// `null` when the path does not resolve. Arrays are walked so objects inside
/// them are substituted, but strings in arrays and a top-level string are
/// copied unchanged. The result is a fresh value.
pub fn apply(template: &Value, bundle: &Value) -> Value {
    match template {
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, value) in map {
                let resolved = match value.as_str().and_then(placeholder_path) {
                    Some(path) => get_path(bundle, path).cloned().unwrap_or(Value::Null),
                    None => apply(value, bundle),
                };
                out.insert(key.clone(), resolved);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(|v| apply(v, bundle)).collect()),
        other => other.clone(),
    }
}
