//! # Risk Agent

use std::sync::Arc;

use crate::contracts::Risks;
use crate::error::AgentError;
use crate::generation::{GenerationPort, OutputShape};

use super::{compose_prompt, decode_output};

const SYSTEM_PROMPT: &str = include_str!("prompts/risk.md");

pub struct RiskAgent {
    port: Arc<dyn GenerationPort>,
}

impl RiskAgent {
    pub const NAME: &'static str = "RiskAgent";

    pub fn new(port: Arc<dyn GenerationPort>) -> Self {
        Self { port }
    }

    pub async fn run(
        &self,
        idea_summary: &str,
        market_positioning: &str,
    ) -> Result<Risks, AgentError> {
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(Risks))
            .map_err(|e| AgentError::Output(e.to_string()))?;
        let prompt = compose_prompt(
            SYSTEM_PROMPT,
            &schema,
            &format!("Analyze risks for: {idea_summary}\n\nMarket Context: {market_positioning}"),
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
    async fn decodes_risks() {
        let port = Arc::new(ScriptedPort::new());
        port.enqueue(
            RiskAgent::NAME,
            serde_json::json!({
                "top_risks": ["Two-sided cold start"],
                "mitigations": ["Seed supply city by city"]
            }),
        );

        let risks = RiskAgent::new(port).run("summary", "niche").await.unwrap();
        assert_eq!(risks.top_risks.len(), 1);
        assert_eq!(risks.mitigations.len(), 1);
    }
}
