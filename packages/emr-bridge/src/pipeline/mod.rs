//! The five-stage mapping pipeline and the plan refinement loop.

mod json;
mod orchestrator;
mod planner;
pub mod prompts;
mod queries;
mod refine;
mod stages;

pub use json::{parse_reply, strip_fences};
pub use orchestrator::MappingPipeline;
pub use planner::{Critique, PlanDraft, PlanSynthesizer, MAX_PROMPT_DOC_CHARS, MAX_REASONING_CHARS};
pub use queries::{fallback_queries, synthesize_queries, MAX_SYNTHESIZED_QUERIES};
pub use refine::{PlanRefiner, RefineOutcome, CONFIDENCE_THRESHOLD};
pub use stages::{
    FetchDocs, PersistMapping, PlanEmr, SearchDocs, SplitQueries, Stage, DEFAULT_EMR_ID,
    DEFAULT_SEARCH_QUERIES,
};
