//! # Clarity Core
//!
//! Business logic for the idea evaluation pipeline: stage agents, the run
//! store, the orchestrator state machine, and report assembly/rendering.
//!
//! ## Architecture
//!
//! - `agents/` - Thin generation-port bindings, one per pipeline stage
//! - `contracts` - Report document and stage payload types
//! - `generation` - The `GenerationPort` seam and its OpenAI-compatible impl
//! - `store/` - Durable run state (SQLite, plus an in-memory fake)
//! - `pipeline/` - The orchestrator state machine and report assembly
//! - `render` - Markdown export of finished reports
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use clarity_core::models::ModelConfig;
//! use clarity_core::generation::OpenAiPort;
//! use clarity_core::pipeline::Orchestrator;
//! use clarity_core::store::{RunStore, SqliteRunStore};
//!
//! let config = ModelConfig::default();
//! let store = Arc::new(SqliteRunStore::open_at("clarity.db")?);
//! let port = Arc::new(OpenAiPort::from_env(config.clone())?);
//! let orchestrator = Orchestrator::new(store.clone(), port, &config);
//! let run_id = store.create_run("Build a stock tracker")?;
//! let outcome = orchestrator.run_analysis(&run_id, "Build a stock tracker").await?;
//! ```

pub mod agents;
pub mod contracts;
pub mod error;
pub mod generation;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod store;

#[cfg(test)]
mod test_support;
