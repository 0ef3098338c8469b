//! Trial-and-correct loop: execute, critique, alter, repeat.

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::planner::{Critique, PlanSynthesizer};
use crate::error::Result;
use crate::executor::{ExecutionOutcome, PlanExecutor};
use crate::types::{Direction, RequestPlan, ResolvedCredentials};

/// Critique confidence at which a successful trial is accepted.
pub const CONFIDENCE_THRESHOLD: u8 = 70;

#[derive(Debug, Clone, Serialize)]
pub struct RefineOutcome {
    pub plan: RequestPlan,
    pub attempts: u32,
    pub accepted: bool,
    pub last_outcome: ExecutionOutcome,
    pub last_critique: Critique,
}

/// Repeatedly runs a plan against the live EMR and asks for corrections.
pub struct PlanRefiner {
    executor: PlanExecutor,
    synthesizer: PlanSynthesizer,
}

impl PlanRefiner {
    pub fn new(executor: PlanExecutor, synthesizer: PlanSynthesizer) -> Self {
        Self {
            executor,
            synthesizer,
        }
    }

    /// Stops once a trial succeeds with confidence at or above
    /// [`CONFIDENCE_THRESHOLD`], or after `max_attempts` trials (at least one).
    pub async fn refine(
        &self,
        plan: RequestPlan,
        bundle: &Value,
        credentials: &ResolvedCredentials,
        direction: Direction,
        max_attempts: u32,
    ) -> Result<RefineOutcome> {
        let max_attempts = max_attempts.max(1);
        let mut plan = plan;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let outcome = self.executor.execute(&plan, bundle, credentials, direction).await;
            let critique = self.synthesizer.critique(&plan, &outcome).await?;
            let accepted = outcome.ok && critique.confidence >= CONFIDENCE_THRESHOLD;

            info!(
                attempt,
                ok = outcome.ok,
                status = ?outcome.status,
                confidence = critique.confidence,
                "Refinement trial"
            );

            if accepted || attempt >= max_attempts {
                return Ok(RefineOutcome {
                    plan,
                    attempts: attempt,
                    accepted,
                    last_outcome: outcome,
                    last_critique: critique,
                });
            }

            plan = self.synthesizer.alter_plan(&plan, &critique.feedback).await?;
        }
    }
}
