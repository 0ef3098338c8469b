//! Read-only helpers over a FHIR bundle.
//!
//! The bundle stays an opaque `serde_json::Value`; only the summary and
//! first-resource lookups below look inside it.

use serde_json::Value;

/// Entries listed in the summary handed to the plan synthesizer.
pub const SUMMARY_MAX_ENTRIES: usize = 15;

/// Whether the value is a JSON object with `resourceType: "Bundle"`.
pub fn is_bundle(value: &Value) -> bool {
    value.get("resourceType").and_then(Value::as_str) == Some("Bundle")
}

fn entries(bundle: &Value) -> &[Value] {
    bundle
        .get("entry")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub fn entry_count(bundle: &Value) -> usize {
    entries(bundle).len()
}

/// Human-readable `resourceType` + `id` listing of the first `max_entries` entries.
pub fn fhir_summary(bundle: &Value, max_entries: usize) -> String {
    let lines: Vec<String> = entries(bundle)
        .iter()
        .take(max_entries)
        .enumerate()
        .map(|(i, entry)| {
            let resource = entry.get("resource");
            let resource_type = resource
                .and_then(|r| r.get("resourceType"))
                .map(display_scalar)
                .unwrap_or_else(|| "?".to_string());
            let id = resource
                .and_then(|r| r.get("id"))
                .map(display_scalar)
                .unwrap_or_else(|| "?".to_string());
            format!("  [{i}] {resource_type} id={id}")
        })
        .collect();

    if lines.is_empty() {
        "(empty bundle)".to_string()
    } else {
        lines.join("\n")
    }
}

/// Id of the first resource of the given type, if any.
pub fn first_resource_id(bundle: &Value, resource_type: &str) -> Option<String> {
    entries(bundle).iter().find_map(|entry| {
        let resource = entry.get("resource")?;
        if resource.get("resourceType").and_then(Value::as_str) != Some(resource_type) {
            return None;
        }
        resource.get("id").map(display_scalar)
    })
}

fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
