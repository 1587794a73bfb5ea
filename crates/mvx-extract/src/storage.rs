//! Storage budget guard
//!
//! Checked once per subject, not per performance: a subject whose extraction
//! would start below the free-space floor is skipped entirely for this run.

use crate::error::{ExtractError, Result};
use mvx_common::bytes::format_bytes;
use std::path::Path;
use tracing::debug;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Free-space floor for admitting new work
#[derive(Debug, Clone, Copy)]
pub struct StorageGuard {
    min_free_bytes: u64,
}

impl StorageGuard {
    pub fn new(min_free_gb: f64) -> Self {
        Self {
            min_free_bytes: (min_free_gb.max(0.0) * GIB) as u64,
        }
    }

    /// Available bytes at `path`, or a `Storage` error below the floor
    pub fn check(&self, path: &Path) -> Result<u64> {
        let free = fs2::available_space(path).map_err(|e| {
            ExtractError::Storage(format!(
                "cannot determine free space at {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!(
            path = %path.display(),
            free = %format_bytes(free),
            floor = %format_bytes(self.min_free_bytes),
            "storage check"
        );

        if free < self.min_free_bytes {
            return Err(ExtractError::Storage(format!(
                "{} free at {}, minimum is {}",
                format_bytes(free),
                path.display(),
                format_bytes(self.min_free_bytes)
            )));
        }
        Ok(free)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_floor_admits_work() {
        let dir = tempfile::tempdir().unwrap();
        let guard = StorageGuard::new(0.0);
        assert!(guard.check(dir.path()).unwrap() > 0);
    }

    #[test]
    fn test_unreachable_floor_rejects_work() {
        let dir = tempfile::tempdir().unwrap();
        let guard = StorageGuard::new(f64::MAX);
        assert!(matches!(
            guard.check(dir.path()),
            Err(ExtractError::Storage(_))
        ));
    }

    #[test]
    fn test_missing_path_is_a_storage_error() {
        let guard = StorageGuard::new(1.0);
        assert!(matches!(
            guard.check(Path::new("/definitely/not/a/real/path")),
            Err(ExtractError::Storage(_))
        ));
    }
}
