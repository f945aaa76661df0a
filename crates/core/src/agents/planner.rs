//! # Planner Agent
//!
//! Expands the raw idea text (optionally enriched with interview answers)
//! into a structured [`Idea`].

use std::sync::Arc;

use crate::contracts::Idea;
use crate::error::AgentError;
use crate::generation::{GenerationPort, OutputShape};

use super::{compose_prompt, decode_output};

const SYSTEM_PROMPT: &str = include_str!("prompts/planner.md");

pub struct PlannerAgent {
    port: Arc<dyn GenerationPort>,
}

impl PlannerAgent {
    pub const NAME: &'static str = "PlannerAgent";

    pub fn new(port: Arc<dyn GenerationPort>) -> Self {
        Self { port }
    }

    pub async fn run(&self, idea_text: &str) -> Result<Idea, AgentError> {
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(Idea))
            .map_err(|e| AgentError::Output(e.to_string()))?;
        let prompt = compose_prompt(
            SYSTEM_PROMPT,
            &schema,
            &format!("Analyze this idea: {idea_text}"),
        );
        let value = self
            .port
            .invoke(Self::NAME, &prompt, OutputShape::Json)
            .await?;
        decode_output(Self::NAME, value)
    }
}
