//! Manifest / progress store
//!
//! A durable SQLite ledger with one row per (subject, performance). The
//! orchestrator is the single writer and upserts a full row after every
//! state transition; SQLite's autocommit makes each update an atomic,
//! immediately persisted unit, so a crash at any point leaves the store at
//! the last fully completed update and readers never see partial rows.

use crate::error::{ExtractError, Result};
use chrono::Utc;
use mvx_common::{PerformanceId, SubjectId};
use rusqlite::{params, Connection, OptionalExtension};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Task lifecycle states persisted in the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Downloading,
    Extracting,
    Completed,
    Failed,
    DownloadFailed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Downloading => "downloading",
            TaskStatus::Extracting => "extracting",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::DownloadFailed => "download_failed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "downloading" => Ok(TaskStatus::Downloading),
            "extracting" => Ok(TaskStatus::Extracting),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "download_failed" => Ok(TaskStatus::DownloadFailed),
            _ => Err(ExtractError::Manifest(format!("unknown task status '{}'", s))),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One persisted row of the ledger
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub subject: String,
    pub performance: String,
    pub status: TaskStatus,
    pub cameras_extracted: u32,
    pub frames: u32,
    pub size_gb: f64,
    pub anno_size_gb: f64,
    pub raw_size_gb: f64,
    pub anno_sha256: Option<String>,
    pub raw_sha256: Option<String>,
    /// RFC 3339 timestamp of the last update
    pub timestamp: String,
    pub error: Option<String>,
}

impl TaskRecord {
    /// Fresh record for a state transition; counters start at zero
    pub fn new(subject: &SubjectId, performance: &PerformanceId, status: TaskStatus) -> Self {
        Self {
            subject: subject.to_string(),
            performance: performance.to_string(),
            status,
            cameras_extracted: 0,
            frames: 0,
            size_gb: 0.0,
            anno_size_gb: 0.0,
            raw_size_gb: 0.0,
            anno_sha256: None,
            raw_sha256: None,
            timestamp: Utc::now().to_rfc3339(),
            error: None,
        }
    }
}

/// Aggregate counts over the ledger
#[derive(Debug, Clone, Default)]
pub struct ManifestSummary {
    pub completed: u32,
    pub failed: u32,
    pub download_failed: u32,
    pub in_progress: u32,
    pub total_size_gb: f64,
}

/// SQLite-backed progress store
pub struct ManifestStore {
    conn: Connection,
}

impl ManifestStore {
    /// Open (or create) the ledger at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| ExtractError::Manifest(format!("failed to open manifest: {}", e)))?;
        init_schema(&conn)?;

        Ok(Self { conn })
    }

    /// In-memory store for testing
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ExtractError::Manifest(format!("failed to open manifest: {}", e)))?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Insert or overwrite the row for the record's (subject, performance)
    ///
    /// Last write wins; every call is persisted before it returns.
    pub fn upsert(&self, record: &TaskRecord) -> Result<()> {
        self.conn
            .execute(
                r#"
                INSERT INTO tasks (
                    subject, performance, status, cameras_extracted, frames,
                    size_gb, anno_size_gb, raw_size_gb, anno_sha256, raw_sha256,
                    timestamp, error
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                ON CONFLICT(subject, performance) DO UPDATE SET
                    status = excluded.status,
                    cameras_extracted = excluded.cameras_extracted,
                    frames = excluded.frames,
                    size_gb = excluded.size_gb,
                    anno_size_gb = excluded.anno_size_gb,
                    raw_size_gb = excluded.raw_size_gb,
                    anno_sha256 = excluded.anno_sha256,
                    raw_sha256 = excluded.raw_sha256,
                    timestamp = excluded.timestamp,
                    error = excluded.error
                "#,
                params![
                    record.subject,
                    record.performance,
                    record.status.as_str(),
                    record.cameras_extracted,
                    record.frames,
                    record.size_gb,
                    record.anno_size_gb,
                    record.raw_size_gb,
                    record.anno_sha256,
                    record.raw_sha256,
                    record.timestamp,
                    record.error,
                ],
            )
            .map_err(|e| ExtractError::Manifest(format!("failed to upsert task row: {}", e)))?;
        Ok(())
    }

    /// Fetch one row by key
    pub fn get(&self, subject: &str, performance: &str) -> Result<Option<TaskRecord>> {
        self.conn
            .query_row(
                r#"
                SELECT subject, performance, status, cameras_extracted, frames,
                       size_gb, anno_size_gb, raw_size_gb, anno_sha256, raw_sha256,
                       timestamp, error
                FROM tasks
                WHERE subject = ?1 AND performance = ?2
                "#,
                params![subject, performance],
                row_to_record,
            )
            .optional()
            .map_err(|e| ExtractError::Manifest(format!("failed to query task row: {}", e)))?
            .map_or(Ok(None), |record| record.map(Some))
    }

    /// Whether the task already reached its terminal completed state
    pub fn is_completed(&self, subject: &str, performance: &str) -> Result<bool> {
        Ok(self
            .get(subject, performance)?
            .map(|record| record.status == TaskStatus::Completed)
            .unwrap_or(false))
    }

    /// Every row, ordered by key
    pub fn all(&self) -> Result<Vec<TaskRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                r#"
                SELECT subject, performance, status, cameras_extracted, frames,
                       size_gb, anno_size_gb, raw_size_gb, anno_sha256, raw_sha256,
                       timestamp, error
                FROM tasks
                ORDER BY subject, performance
                "#,
            )
            .map_err(|e| ExtractError::Manifest(format!("failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], row_to_record)
            .map_err(|e| ExtractError::Manifest(format!("failed to query tasks: {}", e)))?;

        let mut records = Vec::new();
        for row in rows {
            let row =
                row.map_err(|e| ExtractError::Manifest(format!("failed to read task row: {}", e)))?;
            records.push(row?);
        }
        Ok(records)
    }

    /// Aggregate counts for reporting
    pub fn summary(&self) -> Result<ManifestSummary> {
        let mut summary = ManifestSummary::default();
        for record in self.all()? {
            match record.status {
                TaskStatus::Completed => {
                    summary.completed += 1;
                    summary.total_size_gb += record.size_gb;
                }
                TaskStatus::Failed => summary.failed += 1,
                TaskStatus::DownloadFailed => summary.download_failed += 1,
                TaskStatus::Downloading | TaskStatus::Extracting => summary.in_progress += 1,
            }
        }
        Ok(summary)
    }
}

type RecordRow = std::result::Result<TaskRecord, ExtractError>;

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RecordRow> {
    let subject: String = row.get(0)?;
    let performance: String = row.get(1)?;
    let status_text: String = row.get(2)?;
    let cameras_extracted: u32 = row.get(3)?;
    let frames: u32 = row.get(4)?;
    let size_gb: f64 = row.get(5)?;
    let anno_size_gb: f64 = row.get(6)?;
    let raw_size_gb: f64 = row.get(7)?;
    let anno_sha256: Option<String> = row.get(8)?;
    let raw_sha256: Option<String> = row.get(9)?;
    let timestamp: String = row.get(10)?;
    let error: Option<String> = row.get(11)?;

    Ok(status_text.parse::<TaskStatus>().map(|status| TaskRecord {
        subject,
        performance,
        status,
        cameras_extracted,
        frames,
        size_gb,
        anno_size_gb,
        raw_size_gb,
        anno_sha256,
        raw_sha256,
        timestamp,
        error,
    }))
}

/// Create the tasks table and its key index
fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            subject TEXT NOT NULL,
            performance TEXT NOT NULL,
            status TEXT NOT NULL,
            cameras_extracted INTEGER NOT NULL DEFAULT 0,
            frames INTEGER NOT NULL DEFAULT 0,
            size_gb REAL NOT NULL DEFAULT 0,
            anno_size_gb REAL NOT NULL DEFAULT 0,
            raw_size_gb REAL NOT NULL DEFAULT 0,
            anno_sha256 TEXT,
            raw_sha256 TEXT,
            timestamp TEXT NOT NULL,
            error TEXT,
            UNIQUE(subject, performance)
        )
        "#,
        [],
    )
    .map_err(|e| ExtractError::Manifest(format!("failed to create schema: {}", e)))?;
    Ok(())
}
