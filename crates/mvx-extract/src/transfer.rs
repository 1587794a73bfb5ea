//! Archive transfer via an external copy command
//!
//! The remote object store is reached through whatever copy tool the
//! deployment provides (an rclone-style CLI by default). The pipeline only
//! assumes `command... <remote-path> <dest-dir>` semantics: after a
//! successful invocation the archive file exists in the destination
//! directory. Each variant is fetched independently with bounded retries and
//! a fixed delay between attempts; exhausting the retries is not an error
//! here; the orchestrator decides what a missing variant means.

use crate::error::{ExtractError, Result};
use mvx_common::{checksum, PerformanceId, SubjectId, Variant};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Transfer tool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Copy command and leading arguments, e.g. `["rclone", "copy"]`
    #[serde(default = "default_command")]
    pub command: Vec<String>,

    /// Remote root; archives live at
    /// `{remote_root}/{variant}/{subject}/{subject}_{performance}_{variant}.mvc`
    pub remote_root: String,

    /// Extra arguments appended to every invocation
    /// (e.g. `["--transfers", "4"]`)
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Attempts per archive before giving up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between attempts
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
}

fn default_command() -> Vec<String> {
    vec!["rclone".to_string(), "copy".to_string()]
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    30
}

impl TransferConfig {
    pub fn validate(&self) -> Result<()> {
        if self.command.is_empty() {
            return Err(ExtractError::Config(
                "transfer.command must name an executable".to_string(),
            ));
        }
        if self.remote_root.is_empty() {
            return Err(ExtractError::Config(
                "transfer.remote_root must not be empty".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(ExtractError::Config(
                "transfer.max_retries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// A locally landed archive copy
#[derive(Debug, Clone)]
pub struct FetchedArchive {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub sha256: String,
}

/// External-transfer wrapper bound to one temp directory
pub struct Transfer {
    config: TransferConfig,
    temp_dir: PathBuf,
}

impl Transfer {
    pub fn new(config: TransferConfig, temp_dir: PathBuf) -> Self {
        Self { config, temp_dir }
    }

    /// Local/remote file name for one (subject, performance, variant)
    pub fn archive_file_name(
        subject: &SubjectId,
        performance: &PerformanceId,
        variant: Variant,
    ) -> String {
        format!("{}_{}_{}.mvc", subject, performance, variant)
    }

    /// Fetch one archive variant into the temp directory
    ///
    /// Returns `Ok(None)` when every attempt failed; a present local copy
    /// from an earlier interrupted run is reused without re-downloading.
    pub async fn fetch(
        &self,
        subject: &SubjectId,
        performance: &PerformanceId,
        variant: Variant,
    ) -> Result<Option<FetchedArchive>> {
        let file_name = Self::archive_file_name(subject, performance, variant);
        let remote_path = format!(
            "{}/{}/{}/{}",
            self.config.remote_root, variant, subject, file_name
        );
        let local_path = self.temp_dir.join(&file_name);

        std::fs::create_dir_all(&self.temp_dir)?;

        if local_path.exists() {
            info!(path = %local_path.display(), "archive already present locally; skipping download");
            return self.landed(local_path).map(Some);
        }

        for attempt in 1..=self.config.max_retries {
            debug!(remote = %remote_path, attempt, "invoking transfer command");

            let mut command = tokio::process::Command::new(&self.config.command[0]);
            command
                .args(&self.config.command[1..])
                .arg(&remote_path)
                .arg(&self.temp_dir)
                .args(&self.config.extra_args);

            match command.output().await {
                Ok(output) if output.status.success() && local_path.exists() => {
                    let fetched = self.landed(local_path)?;
                    info!(
                        file = %file_name,
                        size = %mvx_common::bytes::format_bytes(fetched.size_bytes),
                        "downloaded archive"
                    );
                    return Ok(Some(fetched));
                }
                Ok(output) => {
                    warn!(
                        remote = %remote_path,
                        attempt,
                        max_retries = self.config.max_retries,
                        stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                        "transfer attempt failed"
                    );
                }
                Err(e) => {
                    warn!(
                        remote = %remote_path,
                        attempt,
                        max_retries = self.config.max_retries,
                        error = %e,
                        "transfer command could not run"
                    );
                }
            }

            if attempt < self.config.max_retries {
                tokio::time::sleep(Duration::from_secs(self.config.retry_delay_secs)).await;
            }
        }

        warn!(remote = %remote_path, "giving up after {} attempts", self.config.max_retries);
        Ok(None)
    }

    fn landed(&self, path: PathBuf) -> Result<FetchedArchive> {
        let size_bytes = std::fs::metadata(&path)?.len();
        let sha256 = checksum::sha256_file(&path)
            .map_err(|e| ExtractError::Transfer(format!("cannot checksum {}: {}", path.display(), e)))?;
        Ok(FetchedArchive {
            path,
            size_bytes,
            sha256,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(remote_root: &str) -> TransferConfig {
        TransferConfig {
            command: vec!["cp".to_string()],
            remote_root: remote_root.to_string(),
            extra_args: vec![],
            max_retries: 2,
            retry_delay_secs: 0,
        }
    }

    fn ids() -> (SubjectId, PerformanceId) {
        ("0026".parse().unwrap(), "s1_all".parse().unwrap())
    }

    #[tokio::test]
    async fn test_fetch_copies_archive() {
        let remote = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let (subject, performance) = ids();

        let src_dir = remote.path().join("anno").join("0026");
        std::fs::create_dir_all(&src_dir).unwrap();
        std::fs::write(src_dir.join("0026_s1_all_anno.mvc"), b"payload").unwrap();

        let transfer = Transfer::new(
            test_config(remote.path().to_str().unwrap()),
            temp.path().to_path_buf(),
        );
        let fetched = transfer
            .fetch(&subject, &performance, Variant::Anno)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fetched.size_bytes, 7);
        assert!(fetched.path.exists());
        assert_eq!(fetched.sha256.len(), 64);
    }

    #[tokio::test]
    async fn test_fetch_missing_remote_exhausts_retries() {
        let remote = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let (subject, performance) = ids();

        let transfer = Transfer::new(
            test_config(remote.path().to_str().unwrap()),
            temp.path().to_path_buf(),
        );
        let fetched = transfer
            .fetch(&subject, &performance, Variant::Raw)
            .await
            .unwrap();

        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn test_fetch_reuses_local_copy() {
        let remote = tempfile::tempdir().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let (subject, performance) = ids();

        // No remote file exists, but a copy from an earlier run does.
        std::fs::write(temp.path().join("0026_s1_all_anno.mvc"), b"old copy").unwrap();

        let transfer = Transfer::new(
            test_config(remote.path().to_str().unwrap()),
            temp.path().to_path_buf(),
        );
        let fetched = transfer
            .fetch(&subject, &performance, Variant::Anno)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(fetched.size_bytes, 8);
    }
}
