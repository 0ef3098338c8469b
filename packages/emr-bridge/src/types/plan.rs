//! Request Plan data model.
//!
//! A plan is produced by a language model, so deserialization is forgiving about
//! shape (nulls, lowercase methods, numeric header values) while the resulting
//! Rust values are strictly typed.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// HTTP method of a request spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
    /// Any other verb, stored uppercased.
    Other(String),
}

impl HttpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Other(verb) => verb,
        }
    }

    /// Parse a verb case-insensitively. Blank input yields the default (POST).
    pub fn parse(verb: &str) -> Self {
        let upper = verb.trim().to_ascii_uppercase();
        match upper.as_str() {
            "GET" => Self::Get,
            "POST" | "" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            _ => Self::Other(upper),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for HttpMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for HttpMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let verb: Option<String> = Option::deserialize(deserializer)?;
        Ok(verb.map(|v| Self::parse(&v)).unwrap_or_default())
    }
}

/// One HTTP call template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RequestSpec {
    #[serde(default)]
    pub method: HttpMethod,

    /// Absolute URL, or a path relative to the credential base URL.
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,

    #[serde(default, deserialize_with = "string_map")]
    pub headers: BTreeMap<String, String>,

    /// Arbitrary JSON; object values of the form `{{path}}` are placeholders.
    #[serde(default)]
    pub body_template: Option<Value>,

    /// FHIR path -> body field name. When empty, `body_template` is sent
    /// without substitution.
    #[serde(default, deserialize_with = "string_map")]
    pub fhir_mapping: BTreeMap<String, String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body_template(mut self, template: Value) -> Self {
        self.body_template = Some(template);
        self
    }

    pub fn with_mapping(mut self, fhir_path: impl Into<String>, field: impl Into<String>) -> Self {
        self.fhir_mapping.insert(fhir_path.into(), field.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Which sequence of a plan to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[serde(alias = "push_fhir")]
    Push,
    #[serde(alias = "get_fhir")]
    Get,
}

impl Direction {
    /// Key of the corresponding plan field.
    pub fn plan_key(&self) -> &'static str {
        match self {
            Self::Push => "push_fhir",
            Self::Get => "get_fhir",
        }
    }
}

/// Two independently ordered sequences of request specs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RequestPlan {
    #[serde(default, deserialize_with = "null_as_default")]
    pub push_fhir: Vec<RequestSpec>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub get_fhir: Vec<RequestSpec>,
}

impl RequestPlan {
    /// The degraded plan returned when synthesis fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// An empty plan is a no-op and needs retry or correction.
    pub fn is_empty(&self) -> bool {
        self.push_fhir.is_empty() && self.get_fhir.is_empty()
    }

    pub fn specs(&self, direction: Direction) -> &[RequestSpec] {
        match direction {
            Direction::Push => &self.push_fhir,
            Direction::Get => &self.get_fhir,
        }
    }

    /// One line per spec, used in critique prompts and logs.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        for direction in [Direction::Push, Direction::Get] {
            for spec in self.specs(direction) {
                lines.push(format!(
                    "{} {} {} ({})",
                    direction.plan_key(),
                    spec.method,
                    spec.url,
                    spec.description
                ));
            }
        }
        if lines.is_empty() {
            "(empty plan)".to_string()
        } else {
            lines.join("\n")
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// String-valued map that accepts numbers and booleans as values and drops nulls.
fn string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<BTreeMap<String, Value>> = Option::deserialize(deserializer)?;
    let mut out = BTreeMap::new();
    for (key, value) in raw.unwrap_or_default() {
        match value {
            Value::String(s) => {
                out.insert(key, s);
            }
            Value::Number(n) => {
                out.insert(key, n.to_string());
            }
            Value::Bool(b) => {
                out.insert(key, b.to_string());
            }
            Value::Null => {}
            other => {
                return Err(de::Error::custom(format!(
                    "expected a scalar value for `{key}`, got {other}"
                )))
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!(HttpMethod::parse("get"), HttpMethod::Get);
        assert_eq!(HttpMethod::parse(" Post "), HttpMethod::Post);
        assert_eq!(HttpMethod::parse(""), HttpMethod::Post);
        assert_eq!(HttpMethod::parse("options"), HttpMethod::Other("OPTIONS".into()));
    }

    #[test]
    fn test_spec_defaults_when_fields_missing() {
        let spec: RequestSpec = serde_json::from_value(json!({"url": "/patients"})).unwrap();

        assert_eq!(spec.method, HttpMethod::Post);
        assert!(spec.headers.is_empty());
        assert!(spec.body_template.is_none());
        assert_eq!(spec.description, "");
    }

    #[test]
    fn test_spec_tolerates_nulls_and_scalar_headers() {
        let spec: RequestSpec = serde_json::from_value(json!({
            "method": null,
            "url": null,
            "headers": {"X-Version": 2, "X-Debug": true, "X-Drop": null},
            "body_template": null,
            "fhir_mapping": null,
            "description": null
        }))
        .unwrap();

        assert_eq!(spec.method, HttpMethod::Post);
        assert_eq!(spec.url, "");
        assert_eq!(spec.headers.get("X-Version").map(String::as_str), Some("2"));
        assert_eq!(spec.headers.get("X-Debug").map(String::as_str), Some("true"));
        assert!(!spec.headers.contains_key("X-Drop"));
    }

    #[test]
    fn test_object_header_value_is_rejected() {
        let result: Result<RequestSpec, _> =
            serde_json::from_value(json!({"headers": {"X": {"nested": 1}}}));
        assert!(result.is_err());
    }

    #[test]
    fn test_plan_null_sequences_become_empty() {
        let plan: RequestPlan =
            serde_json::from_value(json!({"push_fhir": null, "get_fhir": []})).unwrap();
        assert!(plan.is_empty());
    }

    #[test]
    fn test_plan_serializes_both_keys() {
        let value = serde_json::to_value(RequestPlan::empty()).unwrap();
        assert_eq!(value, json!({"push_fhir": [], "get_fhir": []}));
    }

    #[test]
    fn test_direction_accepts_plan_keys() {
        let d: Direction = serde_json::from_value(json!("get_fhir")).unwrap();
        assert_eq!(d, Direction::Get);
        let d: Direction = serde_json::from_value(json!("push")).unwrap();
        assert_eq!(d, Direction::Push);
    }

    #[test]
    fn test_summary_lists_specs() {
        let plan = RequestPlan {
            push_fhir: vec![RequestSpec::new(HttpMethod::Post, "/bundle").with_description("push")],
            get_fhir: vec![],
        };
        assert_eq!(plan.summary(), "push_fhir POST /bundle (push)");
        assert_eq!(RequestPlan::empty().summary(), "(empty plan)");
    }
}
