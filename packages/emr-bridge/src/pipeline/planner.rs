//! Plan synthesizer plus the critique and correction calls.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use super::json::parse_reply;
use super::prompts;
use crate::error::Result;
use crate::executor::ExecutionOutcome;
use crate::text::truncate_chars;
use crate::traits::generator::TextGenerator;
use crate::types::bundle::{fhir_summary, SUMMARY_MAX_ENTRIES};
use crate::types::RequestPlan;

/// Characters of fetched documentation sent to the model.
pub const MAX_PROMPT_DOC_CHARS: usize = 80_000;
/// Characters of the raw reply kept as reasoning.
pub const MAX_REASONING_CHARS: usize = 500;

/// A synthesized plan and the start of the model reply that produced it.
#[derive(Debug, Clone)]
pub struct PlanDraft {
    pub plan: RequestPlan,
    pub reasoning: String,
}

/// Reviewer verdict on a trial run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Critique {
    /// 0..=100
    pub confidence: u8,
    pub feedback: String,
}

impl Critique {
    fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            confidence: 0,
            feedback: reason.into(),
        }
    }
}

pub struct PlanSynthesizer {
    generator: Arc<dyn TextGenerator>,
}

impl PlanSynthesizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Produce a plan from documentation text and a sample bundle.
    ///
    /// A failed call or an unparseable reply yields an empty plan; only
    /// configuration errors propagate.
    pub async fn synthesize(&self, doc_content: &str, bundle: &Value) -> Result<PlanDraft> {
        let user = prompts::plan_emr_user(
            truncate_chars(doc_content, MAX_PROMPT_DOC_CHARS),
            &fhir_summary(bundle, SUMMARY_MAX_ENTRIES),
        );

        let reply = match self.generator.generate(prompts::PLAN_EMR_SYSTEM, &user).await {
            Ok(reply) => reply,
            Err(e) if e.is_config() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Plan generation failed, using empty plan");
                return Ok(PlanDraft {
                    plan: RequestPlan::empty(),
                    reasoning: truncate_chars(&e.to_string(), MAX_REASONING_CHARS).to_string(),
                });
            }
        };

        let plan = match parse_reply::<RequestPlan>(&reply) {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "Plan reply unparseable, using empty plan");
                RequestPlan::empty()
            }
        };

        info!(
            push_fhir = plan.push_fhir.len(),
            get_fhir = plan.get_fhir.len(),
            "Synthesized request plan"
        );
        Ok(PlanDraft {
            plan,
            reasoning: truncate_chars(&reply, MAX_REASONING_CHARS).to_string(),
        })
    }

    /// Score a plan against its last trial run.
    ///
    /// Anything short of a usable verdict scores 0.
    pub async fn critique(&self, plan: &RequestPlan, trial: &ExecutionOutcome) -> Result<Critique> {
        let response_or_error = trial.error.as_deref().unwrap_or(trial.body.as_str());
        let user = prompts::critique_user(
            &plan.summary(),
            trial.ok,
            trial.status,
            truncate_chars(response_or_error, 1000),
        );

        let reply = match self.generator.generate(prompts::CRITIQUE_SYSTEM, &user).await {
            Ok(reply) => reply,
            Err(e) if e.is_config() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Critique generation failed");
                return Ok(Critique::unavailable(format!("critique unavailable: {e}")));
            }
        };

        let critique = match parse_reply::<Value>(&reply) {
            Ok(value) => critique_from_value(&value)
                .unwrap_or_else(|| Critique::unavailable("critique reply missing confidence")),
            Err(e) => Critique::unavailable(format!("critique reply unparseable: {e}")),
        };
        info!(confidence = critique.confidence, "Plan critiqued");
        Ok(critique)
    }

    /// Ask for a corrected plan. Keeps `plan` when no usable correction comes back.
    pub async fn alter_plan(&self, plan: &RequestPlan, feedback: &str) -> Result<RequestPlan> {
        let plan_json = serde_json::to_string_pretty(plan)?;
        let user = prompts::alter_plan_user(&plan_json, feedback);

        let reply = match self.generator.generate(prompts::ALTER_PLAN_SYSTEM, &user).await {
            Ok(reply) => reply,
            Err(e) if e.is_config() => return Err(e),
            Err(e) => {
                warn!(error = %e, "Plan correction failed, keeping current plan");
                return Ok(plan.clone());
            }
        };

        match parse_reply::<RequestPlan>(&reply) {
            Ok(altered) => {
                info!(
                    push_fhir = altered.push_fhir.len(),
                    get_fhir = altered.get_fhir.len(),
                    "Plan corrected"
                );
                Ok(altered)
            }
            Err(e) => {
                warn!(error = %e, "Corrected plan unparseable, keeping current plan");
                Ok(plan.clone())
            }
        }
    }
}

fn critique_from_value(value: &Value) -> Option<Critique> {
    let raw = value.get("confidence")?;
    let confidence = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().trim_end_matches('%').parse().ok()?,
        _ => return None,
    };
    let feedback = value
        .get("feedback")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some(Critique {
        confidence: confidence.round().clamp(0.0, 100.0) as u8,
        feedback,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_bundle, MockGenerator};
    use crate::types::{HttpMethod, RequestSpec};
    use serde_json::json;

    fn synthesizer(generator: MockGenerator) -> (PlanSynthesizer, Arc<MockGenerator>) {
        let generator = Arc::new(generator);
        (PlanSynthesizer::new(generator.clone()), generator)
    }

    fn trial(ok: bool) -> ExecutionOutcome {
        ExecutionOutcome {
            ok,
            status: Some(if ok { 200 } else { 422 }),
            body: "{}".into(),
            error: (!ok).then(|| "HTTP 422: missing patient".to_string()),
            requests_sent: 1,
        }
    }

    #[tokio::test]
    async fn test_synthesize_parses_fenced_plan() {
        let reply = "```json\n{\"push_fhir\": [{\"method\": \"post\", \"url\": \"/fhir/Bundle\", \
                     \"body_template\": {\"p\": \"{{entry[0].resource.id}}\"}}], \"get_fhir\": []}\n```";
        let (synth, generator) = synthesizer(MockGenerator::new().with_default_reply(reply));

        let draft = synth.synthesize("docs", &sample_bundle()).await.unwrap();

        assert_eq!(draft.plan.push_fhir.len(), 1);
        assert_eq!(draft.plan.push_fhir[0].method, HttpMethod::Post);
        assert!(draft.reasoning.starts_with("```json"));
        let user = &generator.calls()[0].user;
        assert!(user.contains("[0] Patient id=patient-1"));
        assert!(user.contains("[1] Encounter id=encounter-1"));
    }

    #[tokio::test]
    async fn test_plain_text_reply_yields_empty_plan() {
        let (synth, _) = synthesizer(MockGenerator::new().with_default_reply("Sorry, no idea."));
        let draft = synth.synthesize("docs", &sample_bundle()).await.unwrap();
        assert!(draft.plan.is_empty());
        assert_eq!(draft.reasoning, "Sorry, no idea.");
    }

    #[tokio::test]
    async fn test_reasoning_is_capped_and_docs_truncated() {
        let long_reply = format!("{{\"push_fhir\": [], \"get_fhir\": []}}{}", " ".repeat(1000));
        let (synth, generator) = synthesizer(MockGenerator::new().with_default_reply(long_reply));
        let docs = "d".repeat(MAX_PROMPT_DOC_CHARS + 500);

        let draft = synth.synthesize(&docs, &sample_bundle()).await.unwrap();

        assert_eq!(draft.reasoning.chars().count(), MAX_REASONING_CHARS);
        let sent_docs = generator.calls()[0].user.matches('d').count();
        assert!(sent_docs < MAX_PROMPT_DOC_CHARS + 500);
    }

    #[tokio::test]
    async fn test_generation_failure_yields_empty_plan() {
        let (synth, _) = synthesizer(MockGenerator::new().failing("rate limited"));
        let draft = synth.synthesize("docs", &sample_bundle()).await.unwrap();
        assert!(draft.plan.is_empty());
        assert!(draft.reasoning.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_config_error_propagates() {
        let (synth, _) = synthesizer(MockGenerator::new().failing_config("no key"));
        assert!(synth.synthesize("docs", &sample_bundle()).await.unwrap_err().is_config());
    }

    #[tokio::test]
    async fn test_critique_parses_and_clamps() {
        let (synth, generator) = synthesizer(
            MockGenerator::new().with_default_reply(r#"{"confidence": 140, "feedback": "looks right"}"#),
        );

        let critique = synth.critique(&RequestPlan::empty(), &trial(false)).await.unwrap();

        assert_eq!(critique.confidence, 100);
        assert_eq!(critique.feedback, "looks right");
        assert!(generator.calls()[0].user.contains("HTTP 422: missing patient"));
    }

    #[tokio::test]
    async fn test_critique_accepts_string_confidence() {
        let (synth, _) = synthesizer(
            MockGenerator::new().with_default_reply(r#"{"confidence": "85%", "feedback": ""}"#),
        );
        let critique = synth.critique(&RequestPlan::empty(), &trial(true)).await.unwrap();
        assert_eq!(critique.confidence, 85);
    }

    #[tokio::test]
    async fn test_unparseable_critique_scores_zero() {
        let (synth, _) = synthesizer(MockGenerator::new().with_default_reply("great plan!"));
        let critique = synth.critique(&RequestPlan::empty(), &trial(true)).await.unwrap();
        assert_eq!(critique.confidence, 0);
        assert!(critique.feedback.contains("unparseable"));
    }

    #[tokio::test]
    async fn test_alter_plan_replaces_plan() {
        let (synth, generator) = synthesizer(MockGenerator::new().with_default_reply(
            r#"{"push_fhir": [{"method": "PUT", "url": "/patients"}], "get_fhir": []}"#,
        ));
        let plan = RequestPlan {
            push_fhir: vec![RequestSpec::new(HttpMethod::Post, "/patient")],
            get_fhir: vec![],
        };

        let altered = synth.alter_plan(&plan, "use PUT /patients").await.unwrap();

        assert_eq!(altered.push_fhir[0].method, HttpMethod::Put);
        assert!(generator.calls()[0].user.contains("\"/patient\""));
        assert!(generator.calls()[0].user.contains("use PUT /patients"));
    }

    #[tokio::test]
    async fn test_alter_plan_keeps_plan_on_garbage() {
        let (synth, _) = synthesizer(MockGenerator::new().with_default_reply("no"));
        let plan = RequestPlan {
            push_fhir: vec![RequestSpec::new(HttpMethod::Post, "/patient")],
            get_fhir: vec![],
        };
        assert_eq!(synth.alter_plan(&plan, "fix it").await.unwrap(), plan);
    }

    #[test]
    fn test_critique_from_value_requires_confidence() {
        assert!(critique_from_value(&json!({"feedback": "x"})).is_none());
        assert_eq!(critique_from_value(&json!({"confidence": -3})).unwrap().confidence, 0);
    }
}
