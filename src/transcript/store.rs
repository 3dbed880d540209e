//! `SQLite` transcript store with async operations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::delegation::Termination;

use super::error::TranscriptError;
use super::schema::SCHEMA;
use super::sink::TranscriptSink;
use super::types::{EventKind, TranscriptEvent};

/// Summary row for one stored resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionSummary {
    pub resolution_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub question: Option<String>,
    pub terminated_by: Option<Termination>,
    pub exchanges: u64,
}

/// Persistent transcript store.
///
/// Uses `SQLite` for storage with blocking work moved onto `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct SqliteTranscript {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

fn parse_uuid(s: &str) -> Uuid {
    Uuid::parse_str(s).unwrap_or_else(|_| Uuid::nil())
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<TranscriptEvent> {
    let id: String = row.get(0)?;
    let resolution_id: String = row.get(1)?;
    let timestamp: String = row.get(2)?;
    let kind: String = row.get(3)?;
    let iteration: Option<i64> = row.get(4)?;
    let terminated_by: Option<String> = row.get(7)?;
    let evidence: Option<String> = row.get(9)?;

    Ok(TranscriptEvent {
        id: parse_uuid(&id),
        resolution_id: parse_uuid(&resolution_id),
        timestamp: parse_timestamp(&timestamp),
        kind: EventKind::parse(&kind),
        iteration: iteration.and_then(|i| usize::try_from(i).ok()),
        question: row.get(5)?,
        answer: row.get(6)?,
        terminated_by: terminated_by.as_deref().and_then(Termination::from_str_opt),
        message: row.get(8)?,
        evidence: evidence.and_then(|s| serde_json::from_str(&s).ok()),
    })
}

impl SqliteTranscript {
    /// Open a transcript store at the specified path.
    ///
    /// Creates parent directories if they don't exist and initializes the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema cannot be applied.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, TranscriptError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                tokio::fs::create_dir_all(parent).await.map_err(|source| {
                    TranscriptError::CreateDir {
                        path: parent.to_path_buf(),
                        source,
                    }
                })?;
            }
        }

        let path_clone = path.clone();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, TranscriptError> {
            let conn = Connection::open(&path_clone).map_err(|source| {
                TranscriptError::DatabaseOpen {
                    path: path_clone,
                    source,
                }
            })?;
            conn.execute_batch(SCHEMA)?;
            Ok(conn)
        })
        .await
        .map_err(|_| TranscriptError::TaskCancelled)??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path),
        })
    }

    /// Open an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created or the schema cannot be applied.
    pub async fn open_in_memory() -> Result<Self, TranscriptError> {
        let conn = tokio::task::spawn_blocking(|| -> Result<Connection, TranscriptError> {
            let conn = Connection::open_in_memory()?;
            conn.execute_batch(SCHEMA)?;
            Ok(conn)
        })
        .await
        .map_err(|_| TranscriptError::TaskCancelled)??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Returns the path to the database, if opened from a file.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Store one event.
    ///
    /// # Errors
    ///
    /// Returns an error if the evidence cannot be serialized or the row cannot be inserted.
    pub async fn insert(&self, event: &TranscriptEvent) -> Result<(), TranscriptError> {
        let id = event.id.to_string();
        let resolution_id = event.resolution_id.to_string();
        let timestamp = event.timestamp.to_rfc3339();
        let kind = event.kind.as_str();
        let iteration = event.iteration.and_then(|i| i64::try_from(i).ok());
        let question = event.question.clone();
        let answer = event.answer.clone();
        let terminated_by = event.terminated_by.map(|t| t.as_str());
        let message = event.message.clone();
        let evidence = event
            .evidence
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<(), TranscriptError> {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO events (id, resolution_id, timestamp, kind, iteration, question, answer, terminated_by, message, evidence)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![id, resolution_id, timestamp, kind, iteration, question, answer, terminated_by, message, evidence],
            )?;
            Ok(())
        })
        .await
        .map_err(|_| TranscriptError::TaskCancelled)?
    }

    /// Events of one resolution in the order they were recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn events_for(
        &self,
        resolution_id: Uuid,
    ) -> Result<Vec<TranscriptEvent>, TranscriptError> {
        let resolution_id = resolution_id.to_string();

        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<TranscriptEvent>, TranscriptError> {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(
                "SELECT id, resolution_id, timestamp, kind, iteration, question, answer, terminated_by, message, evidence
                 FROM events WHERE resolution_id = ?1 ORDER BY rowid ASC",
            )?;
            let events = stmt
                .query_map(params![resolution_id], event_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(events)
        })
        .await
        .map_err(|_| TranscriptError::TaskCancelled)?
    }

    /// Most recent resolutions, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn recent_resolutions(
        &self,
        limit: usize,
    ) -> Result<Vec<ResolutionSummary>, TranscriptError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<ResolutionSummary>, TranscriptError> {
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(
                "SELECT resolution_id,
                        MIN(timestamp),
                        MAX(CASE WHEN kind != 'exchange' THEN question END),
                        MAX(terminated_by),
                        SUM(CASE WHEN kind = 'exchange' THEN 1 ELSE 0 END)
                 FROM events
                 GROUP BY resolution_id
                 ORDER BY MIN(timestamp) DESC
                 LIMIT ?1",
            )?;
            let rows = stmt
                .query_map(params![limit], |row| {
                    let resolution_id: String = row.get(0)?;
                    let started_at: String = row.get(1)?;
                    let question: Option<String> = row.get(2)?;
                    let terminated_by: Option<String> = row.get(3)?;
                    let exchanges: i64 = row.get(4)?;
                    Ok(ResolutionSummary {
                        resolution_id: parse_uuid(&resolution_id),
                        started_at: parse_timestamp(&started_at),
                        question,
                        terminated_by: terminated_by
                            .as_deref()
                            .and_then(Termination::from_str_opt),
                        exchanges: exchanges.unsigned_abs(),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(|_| TranscriptError::TaskCancelled)?
    }

    /// Count total events in the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count_events(&self) -> Result<u64, TranscriptError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<u64, TranscriptError> {
            let conn = conn.blocking_lock();
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?;
            Ok(count.unsigned_abs())
        })
        .await
        .map_err(|_| TranscriptError::TaskCancelled)?
    }
}

#[async_trait]
impl TranscriptSink for SqliteTranscript {
    async fn record(&self, event: &TranscriptEvent) -> Result<(), TranscriptError> {
        self.insert(event).await
    }
}
