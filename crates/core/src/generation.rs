//! # Generation Port
//!
//! Capability abstraction over the text-generation backend: invoke a named
//! role with a prompt and an expected output shape, get back a structured
//! value or a [`GenerationError`]. No retry policy lives here; failures
//! propagate to the orchestrator.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::GenerationError;
use crate::models::{ModelConfig, API_KEY_ENV};

/// Shape the caller expects the generated content to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputShape {
    /// Raw text, returned as a JSON string value
    Text,
    /// A JSON object, fence-stripped and parsed before return
    Json,
}

/// Opaque text-generation capability.
///
/// Implementations must validate that returned content is non-empty and,
/// for [`OutputShape::Json`], parse it into a value after stripping any
/// code-fence wrapper the backend added.
#[async_trait]
pub trait GenerationPort: Send + Sync {
    async fn invoke(
        &self,
        role: &str,
        prompt: &str,
        shape: OutputShape,
    ) -> Result<Value, GenerationError>;
}

/// Strip a markdown code-fence wrapper (```json ... ```) if present.
///
/// Backends routinely wrap JSON payloads in fences despite instructions not
/// to; incidental formatting is not a contract violation.
pub fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json", "JSON", or empty) on the opening fence.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse fence-stripped content into a JSON value.
pub fn parse_json_block(content: &str) -> Result<Value, GenerationError> {
    serde_json::from_str(strip_code_fences(content))
        .map_err(|e| GenerationError::Malformed(e.to_string()))
}

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Generation port backed by an OpenAI-compatible chat-completions endpoint.
pub struct OpenAiPort {
    client: reqwest::Client,
    config: ModelConfig,
    api_key: String,
}

#[derive(serde::Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(serde::Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiPort {
    /// Build a port from config, loading the API key from `OPENAI_API_KEY`.
    pub fn from_env(config: ModelConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| anyhow::anyhow!("{} is not set", API_KEY_ENV))?;
        Ok(Self {
            client: reqwest::Client::new(),
            config,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/');
        format!("{}/chat/completions", base)
    }
}

#[async_trait]
impl GenerationPort for OpenAiPort {
    async fn invoke(
        &self,
        role: &str,
        prompt: &str,
        shape: OutputShape,
    ) -> Result<Value, GenerationError> {
        tracing::debug!(role, model = %self.config.model, "invoking generation backend");

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
            response_format: match shape {
                OutputShape::Json => Some(serde_json::json!({"type": "json_object"})),
                OutputShape::Text => None,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Backend(format!(
                "{}: {}",
                status,
                body.chars().take(300).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Backend(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        if content.trim().is_empty() {
            return Err(GenerationError::Empty);
        }

        match shape {
            OutputShape::Text => Ok(Value::String(content)),
            OutputShape::Json => parse_json_block(&content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fenced_json() {
        let raw = "```json\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn strips_bare_fences() {
        let raw = "```\n{\"a\": 1}\n```";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn leaves_unfenced_content_alone() {
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn parse_json_block_reports_malformed() {
        let err = parse_json_block("not json at all").unwrap_err();
        assert!(matches!(err, GenerationError::Malformed(_)));
    }

    #[test]
    fn endpoint_honors_base_url_override() {
        std::env::set_var(API_KEY_ENV, "test-key");
        let port = OpenAiPort::from_env(
            ModelConfig::default().with_base_url("http://localhost:1234/v1/"),
        )
        .unwrap();
        assert_eq!(port.endpoint(), "http://localhost:1234/v1/chat/completions");
    }
}
