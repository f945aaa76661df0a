//! # Error Types
//!
//! Typed failures for the generation port, stage agents, run store,
//! and the pipeline boundary that separates them.

use thiserror::Error;

/// Failure from the generation backend or shape validation.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Backend returned no content at all
    #[error("generation returned empty content")]
    Empty,
    /// Content could not be parsed into the expected shape
    #[error("generation output malformed: {0}")]
    Malformed(String),
    /// Transport or provider-side failure
    #[error("generation backend error: {0}")]
    Backend(String),
}

/// Failure of one stage agent to produce a usable, validated output.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{0}")]
    Generation(#[from] GenerationError),
    /// Output arrived but did not validate against the stage's contract
    #[error("agent produced unusable output: {0}")]
    Output(String),
}

/// Failure inside the run store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("run not found: {0}")]
    RunNotFound(String),
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("corrupt record for run {run_id}: {detail}")]
    Corrupt { run_id: String, detail: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Pipeline-boundary error. Agent failures are recorded against the run and
/// surface as a `Failed` outcome; store failures abort the invocation.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{0}")]
    Agent(#[from] AgentError),
    #[error("{0}")]
    Store(#[from] StoreError),
}
