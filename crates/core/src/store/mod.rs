//! # Run Store
//!
//! Durable, run-scoped state: run metadata, an append-only event log,
//! per-stage artifacts, the optional interview, and the final report. The
//! store is the sole owner and arbiter of consistency among them; every
//! write is durable before the call returns, because the resume path
//! re-derives everything from what was stored.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryRunStore;
pub use sqlite::SqliteRunStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::contracts::{Interview, Report, StageArtifact};
use crate::error::StoreError;

/// Lifecycle status of a run.
///
/// `Completed` and `Failed` are terminal; `WaitingForInput` is the interview
/// suspension and returns to `Running` on resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Started,
    Running,
    WaitingForInput,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "STARTED",
            Self::Running => "RUNNING",
            Self::WaitingForInput => "WAITING_FOR_INPUT",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "RUNNING" => Self::Running,
            "WAITING_FOR_INPUT" => Self::WaitingForInput,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            _ => Self::Started,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    RunStarted,
    AgentStarted,
    AgentFinished,
    WaitingForInput,
    RunCompleted,
    RunFailed,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RunStarted => "RUN_STARTED",
            Self::AgentStarted => "AGENT_STARTED",
            Self::AgentFinished => "AGENT_FINISHED",
            Self::WaitingForInput => "WAITING_FOR_INPUT",
            Self::RunCompleted => "RUN_COMPLETED",
            Self::RunFailed => "RUN_FAILED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "RUN_STARTED" => Some(Self::RunStarted),
            "AGENT_STARTED" => Some(Self::AgentStarted),
            "AGENT_FINISHED" => Some(Self::AgentFinished),
            "WAITING_FOR_INPUT" => Some(Self::WaitingForInput),
            "RUN_COMPLETED" => Some(Self::RunCompleted),
            "RUN_FAILED" => Some(Self::RunFailed),
            _ => None,
        }
    }
}

/// An immutable, timestamped fact appended to a run's event log.
///
/// Events exist for audit and observability; replay is driven by stored
/// artifacts and the interview, never by the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RunStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Event {
    pub fn new(kind: EventKind) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            agent: None,
            status: None,
            error: None,
        }
    }

    pub fn with_agent(mut self, agent: &str) -> Self {
        self.agent = Some(agent.to_string());
        self
    }

    pub fn with_status(mut self, status: RunStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

/// Run metadata record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub idea_text: String,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Aggregated view of a run: metadata plus everything stored against it.
#[derive(Debug, Clone, Serialize)]
pub struct RunView {
    #[serde(flatten)]
    pub run: RunRecord,
    pub artifacts: Vec<StageArtifact>,
    pub events: Vec<Event>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interview: Option<Interview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
}

/// Durable, run-scoped state container.
///
/// Injected into the orchestrator so tests can swap in an in-memory fake.
/// All operations are atomic with respect to a single run id; the system
/// assumes at most one active orchestrator task per run at a time.
pub trait RunStore: Send + Sync {
    /// Allocate a fresh run with status `STARTED` and an empty event log.
    fn create_run(&self, idea_text: &str) -> Result<String, StoreError>;

    /// Append to the run's event log. Fails with `RunNotFound` for an
    /// unknown run id.
    fn append_event(&self, run_id: &str, event: Event) -> Result<(), StoreError>;

    /// Overwrite the run status and bump `updated_at`. Idempotent; a no-op
    /// for an unknown run id.
    fn update_run_status(&self, run_id: &str, status: RunStatus) -> Result<(), StoreError>;

    /// Upsert an artifact by stage name.
    fn save_artifact(&self, run_id: &str, artifact: &StageArtifact) -> Result<(), StoreError>;

    fn save_interview(&self, run_id: &str, interview: &Interview) -> Result<(), StoreError>;

    fn get_interview(&self, run_id: &str) -> Result<Option<Interview>, StoreError>;

    /// Write the final report, set status `COMPLETED`, and stamp the
    /// completion time. This is the only path that marks a run complete.
    fn save_report(&self, run_id: &str, report: &Report) -> Result<(), StoreError>;

    /// Aggregate metadata, artifacts, events, interview, and report.
    fn get_run(&self, run_id: &str) -> Result<Option<RunView>, StoreError>;

    /// Newest-first run metadata.
    fn list_runs(&self, limit: usize) -> Result<Vec<RunRecord>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            RunStatus::Started,
            RunStatus::Running,
            RunStatus::WaitingForInput,
            RunStatus::Completed,
            RunStatus::Failed,
        ] {
            assert_eq!(RunStatus::from_str(status.as_str()), status);
        }
        assert!(RunStatus::Completed.is_terminal());
        assert!(!RunStatus::WaitingForInput.is_terminal());
    }

    #[test]
    fn event_serializes_kind_as_type_tag() {
        let event = Event::new(EventKind::RunFailed)
            .with_status(RunStatus::Failed)
            .with_error("boom");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RUN_FAILED");
        assert_eq!(json["status"], "FAILED");
        assert_eq!(json["error"], "boom");
        assert!(json.get("agent").is_none());
    }
}
