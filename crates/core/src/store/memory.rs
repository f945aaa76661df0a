//! # In-Memory Run Store
//!
//! HashMap-backed [`RunStore`] with the same semantics as the SQLite
//! backend. Used by orchestrator tests and as a throwaway backend for
//! local experiments.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;

use crate::contracts::{Interview, Report, StageArtifact};
use crate::error::StoreError;

use super::{Event, RunRecord, RunStatus, RunStore, RunView};

#[derive(Debug, Clone)]
struct RunEntry {
    record: RunRecord,
    events: Vec<Event>,
    artifacts: Vec<StageArtifact>,
    interview: Option<Interview>,
    report: Option<Report>,
}

/// In-memory [`RunStore`].
#[derive(Default)]
pub struct MemoryRunStore {
    runs: Mutex<HashMap<String, RunEntry>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_run<T>(
        &self,
        run_id: &str,
        f: impl FnOnce(&mut RunEntry) -> T,
    ) -> Result<T, StoreError> {
        let mut runs = self.lock()?;
        let entry = runs
            .get_mut(run_id)
            .ok_or_else(|| StoreError::RunNotFound(run_id.to_string()))?;
        Ok(f(entry))
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, RunEntry>>, StoreError> {
        self.runs
            .lock()
            .map_err(|e| StoreError::Backend(format!("lock error: {e}")))
    }
}

impl RunStore for MemoryRunStore {
    fn create_run(&self, idea_text: &str) -> Result<String, StoreError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let entry = RunEntry {
            record: RunRecord {
                run_id: run_id.clone(),
                idea_text: idea_text.to_string(),
                status: RunStatus::Started,
                created_at: now,
                updated_at: now,
                completed_at: None,
            },
            events: Vec::new(),
            artifacts: Vec::new(),
            interview: None,
            report: None,
        };
        self.lock()?.insert(run_id.clone(), entry);
        Ok(run_id)
    }

    fn append_event(&self, run_id: &str, event: Event) -> Result<(), StoreError> {
        self.with_run(run_id, |entry| entry.events.push(event))
    }

    fn update_run_status(&self, run_id: &str, status: RunStatus) -> Result<(), StoreError> {
        let mut runs = self.lock()?;
        if let Some(entry) = runs.get_mut(run_id) {
            entry.record.status = status;
            entry.record.updated_at = Utc::now();
        }
        Ok(())
    }

    fn save_artifact(&self, run_id: &str, artifact: &StageArtifact) -> Result<(), StoreError> {
        self.with_run(run_id, |entry| {
            match entry.artifacts.iter_mut().find(|a| a.stage == artifact.stage) {
                Some(existing) => *existing = artifact.clone(),
                None => entry.artifacts.push(artifact.clone()),
            }
        })
    }

    fn save_interview(&self, run_id: &str, interview: &Interview) -> Result<(), StoreError> {
        self.with_run(run_id, |entry| entry.interview = Some(interview.clone()))
    }

    fn get_interview(&self, run_id: &str) -> Result<Option<Interview>, StoreError> {
        Ok(self.lock()?.get(run_id).and_then(|e| e.interview.clone()))
    }

    fn save_report(&self, run_id: &str, report: &Report) -> Result<(), StoreError> {
        self.with_run(run_id, |entry| {
            entry.report = Some(report.clone());
            entry.record.status = RunStatus::Completed;
            let now = Utc::now();
            entry.record.updated_at = now;
            entry.record.completed_at = Some(now);
        })
    }

    fn get_run(&self, run_id: &str) -> Result<Option<RunView>, StoreError> {
        Ok(self.lock()?.get(run_id).map(|entry| RunView {
            run: entry.record.clone(),
            artifacts: entry.artifacts.clone(),
            events: entry.events.clone(),
            interview: entry.interview.clone(),
            report: entry.report.clone(),
        }))
    }

    fn list_runs(&self, limit: usize) -> Result<Vec<RunRecord>, StoreError> {
        let runs = self.lock()?;
        let mut records: Vec<RunRecord> = runs.values().map(|e| e.record.clone()).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(limit);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EventKind;

    #[test]
    fn mirrors_sqlite_semantics() {
        let store = MemoryRunStore::new();
        let run_id = store.create_run("idea").unwrap();

        // Unknown-run contracts match the SQLite backend.
        assert!(matches!(
            store.append_event("missing", Event::new(EventKind::RunStarted)),
            Err(StoreError::RunNotFound(_))
        ));
        store
            .update_run_status("missing", RunStatus::Failed)
            .unwrap();

        store
            .append_event(&run_id, Event::new(EventKind::RunStarted))
            .unwrap();
        store
            .update_run_status(&run_id, RunStatus::Running)
            .unwrap();

        let view = store.get_run(&run_id).unwrap().unwrap();
        assert_eq!(view.run.status, RunStatus::Running);
        assert_eq!(view.events.len(), 1);
    }
}
