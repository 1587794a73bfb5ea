//! Error types for the MVX CLI

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// User-facing CLI errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Pipeline-level failure (configuration, transfer, manifest, ...)
    #[error(transparent)]
    Extract(#[from] mvx_extract::ExtractError),

    /// Archive could not be opened or read
    #[error(transparent)]
    Archive(#[from] mvx_archive::ArchiveError),

    /// Logging could not be initialized
    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),
}
