//! # Stage Agents
//!
//! Thin, named bindings of the generation port to one role and one expected
//! output shape each. Agents validate and decode; they never retry — retry
//! policy, if any, belongs to the orchestrator.

pub mod evaluator;
pub mod execution;
pub mod interviewer;
pub mod judge;
pub mod market;
pub mod planner;
pub mod risk;

pub use evaluator::InterviewEvaluatorAgent;
pub use execution::ExecutionAgent;
pub use interviewer::{InterviewerAgent, QuestionDraft};
pub use judge::JudgeAgent;
pub use market::{MarketAgent, MarketOutput};
pub use planner::PlannerAgent;
pub use risk::RiskAgent;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AgentError;

/// Decode a generation payload into the stage's contract type.
pub(crate) fn decode_output<T: DeserializeOwned>(agent: &str, value: Value) -> Result<T, AgentError> {
    serde_json::from_value(value).map_err(|e| AgentError::Output(format!("{agent}: {e}")))
}

/// Compose the full prompt: system instructions, the declared output schema,
/// and the stage input.
pub(crate) fn compose_prompt(system: &str, schema: &str, input: &str) -> String {
    format!(
        "{system}\n\nRespond with a single JSON object matching this schema:\n{schema}\n\n{input}"
    )
}
