//! Error types for archive access

use thiserror::Error;

/// Result type alias for archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Errors surfaced by the archive reader and writer
///
/// `Format` means the container itself is unusable and the task working on it
/// should abort. `InvalidRequest` marks a malformed request (caller bug).
/// `NotFound` is only raised where absence is hard by contract: single-camera
/// calibration lookups and batch image access. Routine absence (a camera or
/// frame that was never captured) is reported as `Ok(None)` by the accessors,
/// not through this type.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Archive is missing required metadata or is structurally corrupt
    #[error("invalid archive format: {0}")]
    Format(String),

    /// Malformed camera id or out-of-range frame id
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Requested entry is absent where absence is a hard error
    #[error("not found: {0}")]
    NotFound(String),

    /// Payload bytes could not be decoded into the requested type
    #[error("decode failed: {0}")]
    Decode(String),

    /// Payload could not be serialized while building an archive
    #[error("encode failed: {0}")]
    Encode(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
