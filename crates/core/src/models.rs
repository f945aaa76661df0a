//! # Model Configuration
//!
//! Centralized configuration for the generation backend. The pipeline only
//! sees the [`crate::generation::GenerationPort`] trait; this type configures
//! the concrete OpenAI-compatible adapter and labels reports with the model
//! that produced them.

use serde::{Deserialize, Serialize};

/// Default chat model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Environment variable holding the backend API key.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Configuration for generation model selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name (e.g. "gpt-4o", "gpt-4o-mini")
    pub model: String,
    /// Optional base URL override for OpenAI-compatible endpoints
    #[serde(default)]
    pub base_url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
        }
    }
}

impl ModelConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            base_url: None,
        }
    }

    /// Set base URL (for OpenAI-compatible endpoints)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}
