//! # Market Agent
//!
//! One generation call that returns a combined payload; this agent is
//! responsible for splitting and validating the audience and market
//! sub-shapes out of it.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::contracts::{Audience, Market};
use crate::error::AgentError;
use crate::generation::{GenerationPort, OutputShape};

use super::{compose_prompt, decode_output};

const SYSTEM_PROMPT: &str = include_str!("prompts/market.md");

/// Combined shape the market role is asked for.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
struct MarketPayload {
    #[serde(default)]
    audience: Audience,
    market: Market,
}

/// Split and validated market output, with the raw payload preserved for
/// the stage artifact.
#[derive(Debug, Clone)]
pub struct MarketOutput {
    pub audience: Audience,
    pub market: Market,
    pub raw: Value,
}

pub struct MarketAgent {
    port: Arc<dyn GenerationPort>,
}

impl MarketAgent {
    pub const NAME: &'static str = "MarketAgent";

    pub fn new(port: Arc<dyn GenerationPort>) -> Self {
        Self { port }
    }

    pub async fn run(&self, idea_summary: &str) -> Result<MarketOutput, AgentError> {
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(MarketPayload))
            .map_err(|e| AgentError::Output(e.to_string()))?;
        let prompt = compose_prompt(
            SYSTEM_PROMPT,
            &schema,
            &format!("Analyze market for: {idea_summary}"),
        );
        let raw = self
            .port
            .invoke(Self::NAME, &prompt, OutputShape::Json)
            .await?;
        let payload: MarketPayload = decode_output(Self::NAME, raw.clone())?;
        Ok(MarketOutput {
            audience: payload.audience,
            market: payload.market,
            raw,
        })
    }
}
