//! Error types for the extraction pipeline
//!
//! The taxonomy mirrors how the orchestrator reacts: `Transfer` moves a task
//! to `download_failed`, `Storage` skips the rest of the current subject,
//! `Archive` format errors abort the task, and per-item extraction failures
//! never reach this type at all; extractors catch them, count them, and
//! keep going. Only `Config` is fatal to the whole run.

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Errors surfaced by the extraction pipeline
#[derive(Error, Debug)]
pub enum ExtractError {
    /// Run configuration is invalid; nothing was started
    #[error("configuration error: {0}")]
    Config(String),

    /// Download failed after exhausting retries
    #[error("transfer failed: {0}")]
    Transfer(String),

    /// Free space is below the configured floor
    #[error("insufficient storage: {0}")]
    Storage(String),

    /// Container could not be opened or read
    #[error(transparent)]
    Archive(#[from] mvx_archive::ArchiveError),

    /// Manifest ledger operation failed
    #[error("manifest error: {0}")]
    Manifest(String),

    /// An extraction step failed in a way that aborts the task
    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
