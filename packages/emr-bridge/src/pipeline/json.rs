//! JSON extraction from model output.

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

use crate::error::Result;

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)\s*```").expect("valid regex"));

/// The JSON payload of a model reply: the first fenced block if any, else the trimmed text.
pub fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    match FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => text,
    }
}

pub fn parse_reply<T: DeserializeOwned>(text: &str) -> Result<T> {
    Ok(serde_json::from_str(strip_fences(text))?)
}
