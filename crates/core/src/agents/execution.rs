//! # Execution Agent

use std::sync::Arc;

use crate::contracts::Execution;
use crate::error::AgentError;
use crate::generation::{GenerationPort, OutputShape};

use super::{compose_prompt, decode_output};

const SYSTEM_PROMPT: &str = include_str!("prompts/execution.md");

pub struct ExecutionAgent {
    port: Arc<dyn GenerationPort>,
}

impl ExecutionAgent {
    pub const NAME: &'static str = "ExecutionAgent";

    pub fn new(port: Arc<dyn GenerationPort>) -> Self {
        Self { port }
    }

    pub async fn run(
        &self,
        idea_summary: &str,
        risks_summary: &str,
    ) -> Result<Execution, AgentError> {
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(Execution))
            .map_err(|e| AgentError::Output(e.to_string()))?;
        let prompt = compose_prompt(
            SYSTEM_PROMPT,
            &schema,
            &format!("Create execution plan for: {idea_summary}\n\nRisks: {risks_summary}"),
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
    use crate::test_support::ScriptedPort;

    #[tokio::test]
    async fn decodes_execution_plan() {
        let port = Arc::new(ScriptedPort::new());
        port.enqueue(
            ExecutionAgent::NAME,
            serde_json::json!({
                "mvp_scope": ["Search", "Booking"],
                "two_week_plan": ["Design flows"],
                "two_month_plan": ["Pilot in one city"]
            }),
        );

        let plan = ExecutionAgent::new(port)
            .run("summary", "[\"cold start\"]")
            .await
            .unwrap();
        assert_eq!(plan.mvp_scope, vec!["Search", "Booking"]);
    }
}
