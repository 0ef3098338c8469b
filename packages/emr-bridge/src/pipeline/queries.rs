//! Query synthesizer: documentation URL to search queries.

use serde_json::Value;
use tracing::{info, warn};

use super::json::parse_reply;
use super::prompts;
use crate::error::Result;
use crate::traits::generator::TextGenerator;
use crate::types::SearchQueries;

pub const MAX_SYNTHESIZED_QUERIES: usize = 5;

/// Deterministic queries used whenever the model gives nothing usable.
pub fn fallback_queries(api_doc_url: &str) -> Vec<String> {
    let url = api_doc_url.trim();
    let first = if url.is_empty() {
        "EMR API documentation".to_string()
    } else {
        format!("{url} API documentation")
    };
    vec![first, "EMR REST API endpoints".to_string(), "FHIR API push".to_string()]
}

/// Ask the model for search queries. Always returns at least one query.
///
/// Only configuration errors propagate; a failed call or an unusable reply
/// falls back to [`fallback_queries`].
pub async fn synthesize_queries(generator: &dyn TextGenerator, api_doc_url: &str) -> Result<SearchQueries> {
    let reply = match generator
        .generate(prompts::SPLIT_QUERIES_SYSTEM, &prompts::split_queries_user(api_doc_url))
        .await
    {
        Ok(reply) => reply,
        Err(e) if e.is_config() => return Err(e),
        Err(e) => {
            warn!(error = %e, "Query generation failed, using fallback queries");
            return Ok(SearchQueries {
                queries: fallback_queries(api_doc_url),
            });
        }
    };

    let queries = match queries_from_reply(&reply) {
        Some(queries) => queries,
        None => {
            warn!("Query reply unusable, using fallback queries");
            fallback_queries(api_doc_url)
        }
    };

    info!(count = queries.len(), first = ?queries.first(), "Synthesized search queries");
    Ok(SearchQueries { queries })
}

fn queries_from_reply(reply: &str) -> Option<Vec<String>> {
    let parsed: Value = parse_reply(reply).ok()?;
    let queries: Vec<String> = parsed
        .get("queries")?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .take(MAX_SYNTHESIZED_QUERIES)
        .map(str::to_string)
        .collect();
    (!queries.is_empty()).then_some(queries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockGenerator;

    #[tokio::test]
    async fn test_parses_fenced_queries() {
        let generator = MockGenerator::new()
            .with_default_reply("```json\n{\"queries\": [\"acme emr api\", \" \", \"acme auth\"]}\n```");

        let queries = synthesize_queries(&generator, "https://acme.example").await.unwrap();

        assert_eq!(queries.queries, vec!["acme emr api", "acme auth"]);
        assert!(generator.calls()[0].user.contains("https://acme.example"));
    }

    #[tokio::test]
    async fn test_caps_query_count() {
        let generator = MockGenerator::new()
            .with_default_reply(r#"{"queries": ["1", "2", "3", "4", "5", "6", "7"]}"#);
        let queries = synthesize_queries(&generator, "").await.unwrap();
        assert_eq!(queries.queries.len(), MAX_SYNTHESIZED_QUERIES);
    }

    #[tokio::test]
    async fn test_malformed_reply_falls_back() {
        for reply in ["not json", r#"{"other": 1}"#, r#"{"queries": []}"#, r#"{"queries": "x"}"#] {
            let generator = MockGenerator::new().with_default_reply(reply);
            let queries = synthesize_queries(&generator, "https://acme.example").await.unwrap();
            assert_eq!(queries.queries, fallback_queries("https://acme.example"), "reply: {reply}");
        }
    }

    #[tokio::test]
    async fn test_generation_failure_falls_back() {
        let generator = MockGenerator::new().failing("upstream 503");
        let queries = synthesize_queries(&generator, "").await.unwrap();
        assert_eq!(queries.queries[0], "EMR API documentation");
    }

    #[tokio::test]
    async fn test_config_error_propagates() {
        let generator = MockGenerator::new().failing_config("GROQ_API_KEY not set");
        let err = synthesize_queries(&generator, "").await.unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_fallback_never_empty() {
        assert_eq!(fallback_queries("  ").len(), 3);
        assert_eq!(fallback_queries("https://x")[0], "https://x API documentation");
    }
}
