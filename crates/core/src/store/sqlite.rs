//! # SQLite Run Store
//!
//! Single SQLite database holding every run's metadata, event log,
//! artifacts, interview, and report. Schema changes go through the
//! `schema_version` table.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::contracts::{Interview, Report, StageArtifact};
use crate::error::StoreError;

use super::{Event, EventKind, RunRecord, RunStatus, RunStore, RunView};

/// Schema version for migrations
const SCHEMA_VERSION: i32 = 1;

/// SQLite-backed [`RunStore`].
pub struct SqliteRunStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRunStore {
    /// Open or create the database at `path`.
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path.as_ref())?;
        Self::from_connection(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Backend(format!("lock error: {e}")))
    }

    fn run_migrations(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
            [],
        )?;

        let current_version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version < SCHEMA_VERSION {
            Self::migrate_v1(&conn)?;
            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )?;
        }

        Ok(())
    }

    fn migrate_v1(conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                run_id TEXT PRIMARY KEY,
                idea_text TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'STARTED',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                completed_at TEXT
            )
            "#,
            [],
        )?;

        // Append sequence is the rowid; events are never updated or deleted.
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                kind TEXT NOT NULL,
                agent TEXT,
                status TEXT,
                error TEXT
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS artifacts (
                run_id TEXT NOT NULL,
                stage TEXT NOT NULL,
                data TEXT NOT NULL,
                PRIMARY KEY (run_id, stage)
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS interviews (
                run_id TEXT PRIMARY KEY,
                data TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS reports (
                run_id TEXT PRIMARY KEY,
                data TEXT NOT NULL
            )
            "#,
            [],
        )?;

        Ok(())
    }

    fn run_exists(conn: &Connection, run_id: &str) -> Result<bool, StoreError> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM runs WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<RunRecord> {
        let status: String = row.get(2)?;
        let created_at: String = row.get(3)?;
        let updated_at: String = row.get(4)?;
        let completed_at: Option<String> = row.get(5)?;
        Ok(RunRecord {
            run_id: row.get(0)?,
            idea_text: row.get(1)?,
            status: RunStatus::from_str(&status),
            created_at: parse_ts(&created_at),
            updated_at: parse_ts(&updated_at),
            completed_at: completed_at.as_deref().map(parse_ts),
        })
    }
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl RunStore for SqliteRunStore {
    fn create_run(&self, idea_text: &str) -> Result<String, StoreError> {
        let conn = self.lock()?;
        let run_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            r#"
            INSERT INTO runs (run_id, idea_text, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
            params![run_id, idea_text, RunStatus::Started.as_str(), now],
        )?;
        Ok(run_id)
    }

    fn append_event(&self, run_id: &str, event: Event) -> Result<(), StoreError> {
        let conn = self.lock()?;
        if !Self::run_exists(&conn, run_id)? {
            return Err(StoreError::RunNotFound(run_id.to_string()));
        }
        conn.execute(
            r#"
            INSERT INTO events (run_id, timestamp, kind, agent, status, error)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                run_id,
                event.timestamp.to_rfc3339(),
                event.kind.as_str(),
                event.agent,
                event.status.map(|s| s.as_str()),
                event.error,
            ],
        )?;
        Ok(())
    }

    fn update_run_status(&self, run_id: &str, status: RunStatus) -> Result<(), StoreError> {
        let conn = self.lock()?;
        // Unknown run is a no-op by contract.
        conn.execute(
            "UPDATE runs SET status = ?1, updated_at = ?2 WHERE run_id = ?3",
            params![status.as_str(), Utc::now().to_rfc3339(), run_id],
        )?;
        Ok(())
    }

    fn save_artifact(&self, run_id: &str, artifact: &StageArtifact) -> Result<(), StoreError> {
        let conn = self.lock()?;
        if !Self::run_exists(&conn, run_id)? {
            return Err(StoreError::RunNotFound(run_id.to_string()));
        }
        let data = serde_json::to_string(artifact)?;
        conn.execute(
            "INSERT OR REPLACE INTO artifacts (run_id, stage, data) VALUES (?1, ?2, ?3)",
            params![run_id, artifact.stage, data],
        )?;
        Ok(())
    }

    fn save_interview(&self, run_id: &str, interview: &Interview) -> Result<(), StoreError> {
        let conn = self.lock()?;
        if !Self::run_exists(&conn, run_id)? {
            return Err(StoreError::RunNotFound(run_id.to_string()));
        }
        let data = serde_json::to_string(interview)?;
        conn.execute(
            "INSERT OR REPLACE INTO interviews (run_id, data) VALUES (?1, ?2)",
            params![run_id, data],
        )?;
        Ok(())
    }

    fn get_interview(&self, run_id: &str) -> Result<Option<Interview>, StoreError> {
        let conn = self.lock()?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM interviews WHERE run_id = ?1",
                params![run_id],
                |row| row.get(0),
            )
            .optional()?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json).map_err(|e| {
                StoreError::Corrupt {
                    run_id: run_id.to_string(),
                    detail: e.to_string(),
                }
            })?)),
            None => Ok(None),
        }
    }

    fn save_report(&self, run_id: &str, report: &Report) -> Result<(), StoreError> {
        let conn = self.lock()?;
        if !Self::run_exists(&conn, run_id)? {
            return Err(StoreError::RunNotFound(run_id.to_string()));
        }
        let data = serde_json::to_string(report)?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR REPLACE INTO reports (run_id, data) VALUES (?1, ?2)",
            params![run_id, data],
        )?;
        conn.execute(
            "UPDATE runs SET status = ?1, updated_at = ?2, completed_at = ?2 WHERE run_id = ?3",
            params![RunStatus::Completed.as_str(), now, run_id],
        )?;
        Ok(())
    }

    fn get_run(&self, run_id: &str) -> Result<Option<RunView>, StoreError> {
        let conn = self.lock()?;

        let run = conn
            .query_row(
                r#"
                SELECT run_id, idea_text, status, created_at, updated_at, completed_at
                FROM runs WHERE run_id = ?1
                "#,
                params![run_id],
                Self::row_to_record,
            )
            .optional()?;
        let Some(run) = run else {
            return Ok(None);
        };

        let mut stmt =
            conn.prepare("SELECT data FROM artifacts WHERE run_id = ?1 ORDER BY rowid")?;
        let artifacts = stmt
            .query_map(params![run_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter_map(|json| serde_json::from_str::<StageArtifact>(&json).ok())
            .collect();

        let mut stmt = conn.prepare(
            "SELECT timestamp, kind, agent, status, error FROM events WHERE run_id = ?1 ORDER BY seq",
        )?;
        let events = stmt
            .query_map(params![run_id], |row| {
                let timestamp: String = row.get(0)?;
                let kind: String = row.get(1)?;
                let status: Option<String> = row.get(3)?;
                Ok((
                    timestamp,
                    kind,
                    row.get::<_, Option<String>>(2)?,
                    status,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter_map(|(timestamp, kind, agent, status, error)| {
                Some(Event {
                    timestamp: parse_ts(&timestamp),
                    kind: EventKind::from_str(&kind)?,
                    agent,
                    status: status.as_deref().map(RunStatus::from_str),
                    error,
                })
            })
            .collect();

        let interview: Option<Interview> = conn
            .query_row(
                "SELECT data FROM interviews WHERE run_id = ?1",
                params![run_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .and_then(|json| serde_json::from_str(&json).ok());

        let report: Option<Report> = conn
            .query_row(
                "SELECT data FROM reports WHERE run_id = ?1",
                params![run_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?
            .and_then(|json| serde_json::from_str(&json).ok());

        Ok(Some(RunView {
            run,
            artifacts,
            events,
            interview,
            report,
        }))
    }

    fn list_runs(&self, limit: usize) -> Result<Vec<RunRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT run_id, idea_text, status, created_at, updated_at, completed_at
            FROM runs ORDER BY created_at DESC LIMIT ?1
            "#,
        )?;
        let runs = stmt
            .query_map(params![limit as i64], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }
}
