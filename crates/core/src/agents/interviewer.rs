//! # Interviewer Agent
//!
//! Decides what must be asked before deep analysis can proceed. Invoked with
//! a text shape so that a backend that ignores the JSON instruction can
//! still be salvaged: lines containing a question mark become questions with
//! no guidance.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::generation::{parse_json_block, GenerationPort, OutputShape};

const SYSTEM_PROMPT: &str = include_str!("prompts/interviewer.md");

/// A question as drafted by the agent, before ids are assigned.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct QuestionDraft {
    pub text: String,
    #[serde(default)]
    pub guidance: Option<String>,
}

#[derive(Debug, Default, Deserialize, JsonSchema)]
struct InterviewerPayload {
    #[serde(default)]
    questions: Vec<QuestionDraft>,
}

pub struct InterviewerAgent {
    port: Arc<dyn GenerationPort>,
}

impl InterviewerAgent {
    pub const NAME: &'static str = "InterviewerAgent";

    pub fn new(port: Arc<dyn GenerationPort>) -> Self {
        Self { port }
    }

    /// Returns the drafted questions, possibly none.
    pub async fn run(&self, idea_text: &str) -> Result<Vec<QuestionDraft>, AgentError> {
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(InterviewerPayload))
            .map_err(|e| AgentError::Output(e.to_string()))?;
        let prompt = format!(
            "{SYSTEM_PROMPT}\n\nThe expected JSON shape:\n{schema}\n\nAnalyze this idea and generate questions: {idea_text}"
        );
        let value = self
            .port
            .invoke(Self::NAME, &prompt, OutputShape::Text)
            .await?;
        let content = value
            .as_str()
            .ok_or_else(|| AgentError::Output(format!("{}: expected text content", Self::NAME)))?;

        match parse_json_block(content) {
            Ok(json) => {
                // Tolerate a valid object without a questions key.
                let payload: InterviewerPayload = serde_json::from_value(json).unwrap_or_default();
                Ok(payload.questions)
            }
            Err(_) => Ok(fallback_questions(content)),
        }
    }
}

/// Heuristic fallback when the output is not valid JSON: every line that
/// contains a question mark becomes a question, guidance absent.
fn fallback_questions(content: &str) -> Vec<QuestionDraft> {
    content
        .lines()
        .filter(|line| line.contains('?'))
        .map(|line| QuestionDraft {
            text: line
                .trim()
                .trim_start_matches(['-', '*', ' '])
                .to_string(),
            guidance: None,
        })
        .collect()
}
