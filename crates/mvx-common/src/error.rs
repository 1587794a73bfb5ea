//! Error types for the MVX foundation crate

use thiserror::Error;

/// Result type alias for foundation operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Errors produced by the shared foundation utilities
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid identifier: {0}")]
    InvalidId(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}
