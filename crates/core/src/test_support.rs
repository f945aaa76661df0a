//! Test doubles shared across the crate's unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GenerationError;
use crate::generation::{GenerationPort, OutputShape};

/// Generation port that replays queued responses per role.
///
/// Each `invoke` pops the next queued result for that role; an empty queue
/// yields a backend error so a test that under-scripts fails loudly.
#[derive(Default)]
pub struct ScriptedPort {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, GenerationError>>>>,
}

impl ScriptedPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, role: &str, value: Value) {
        self.responses
            .lock()
            .unwrap()
            .entry(role.to_string())
            .or_default()
            .push_back(Ok(value));
    }

    /// Queue a raw text response (what `OutputShape::Text` invocations see).
    pub fn enqueue_text(&self, role: &str, text: &str) {
        self.enqueue(role, Value::String(text.to_string()));
    }

    pub fn enqueue_error(&self, role: &str, err: GenerationError) {
        self.responses
            .lock()
            .unwrap()
            .entry(role.to_string())
            .or_default()
            .push_back(Err(err));
    }
}

#[async_trait]
impl GenerationPort for ScriptedPort {
    async fn invoke(
        &self,
        role: &str,
        _prompt: &str,
        _shape: OutputShape,
    ) -> Result<Value, GenerationError> {
        let next = self
            .responses
            .lock()
            .unwrap()
            .get_mut(role)
            .and_then(|queue| queue.pop_front());
        next.unwrap_or_else(|| {
            Err(GenerationError::Backend(format!(
                "no scripted response for {role}"
            )))
        })
    }
}
