//! # Judge Agent
//!
//! Delivers the final verdict from a textual digest of everything the
//! earlier stages produced.

use std::sync::Arc;

use crate::contracts::Recommendation;
use crate::error::AgentError;
use crate::generation::{GenerationPort, OutputShape};

use super::{compose_prompt, decode_output};

const SYSTEM_PROMPT: &str = include_str!("prompts/judge.md");

pub struct JudgeAgent {
    port: Arc<dyn GenerationPort>,
}

impl JudgeAgent {
    pub const NAME: &'static str = "JudgeAgent";

    pub fn new(port: Arc<dyn GenerationPort>) -> Self {
        Self { port }
    }

    pub async fn run(&self, summary_context: &str) -> Result<Recommendation, AgentError> {
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(Recommendation))
            .map_err(|e| AgentError::Output(e.to_string()))?;
        let prompt = compose_prompt(
            SYSTEM_PROMPT,
            &schema,
            &format!("Final verdict based on: {summary_context}"),
        );
        let value = self
            .port
            .invoke(Self::NAME, &prompt, OutputShape::Json)
            .await?;
        decode_output(Self::NAME, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::Verdict;
    use crate::test_support::ScriptedPort;

    #[tokio::test]
    async fn decodes_recommendation_with_scores() {
        let port = Arc::new(ScriptedPort::new());
        port.enqueue(
            JudgeAgent::NAME,
            serde_json::json!({
                "verdict": "PURSUE",
                "confidence": 0.85,
                "scores": {
                    "market_demand": {"score": 8.0, "reasoning": "High demand"},
                    "competitive_advantage": {"score": 7.0, "reasoning": "Differentiated"},
                    "technical_feasibility": {"score": 9.0, "reasoning": "Standard stack"},
                    "business_viability": {"score": 8.0, "reasoning": "Clear revenue"}
                },
                "rationale": "Strong demand, manageable risks"
            }),
        );

        let rec = JudgeAgent::new(port).run("digest").await.unwrap();
        assert_eq!(rec.verdict, Verdict::Pursue);
        assert!(rec.scores.is_some());
    }

    #[tokio::test]
    async fn rejects_unknown_verdict() {
        let port = Arc::new(ScriptedPort::new());
        port.enqueue(
            JudgeAgent::NAME,
            serde_json::json!({
                "verdict": "MAYBE",
                "confidence": 0.5,
                "rationale": "?"
            }),
        );

        let err = JudgeAgent::new(port).run("digest").await.unwrap_err();
        assert!(matches!(err, AgentError::Output(_)));
    }
}
