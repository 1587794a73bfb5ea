//! Extraction orchestrator
//!
//! Drives the per-(subject, performance) state machine:
//! `Queued -> Downloading -> Extracting -> Verifying -> Completed | Failed`.
//! Subjects run one at a time, performances within a subject one at a time,
//! and each task finishes its full sequence before the next begins; there
//! is no task pool. Sequential extraction order is what makes interrupted
//! runs resumable: a partially written camera's missing frames are exactly
//! those still to do.

use crate::config::PipelineConfig;
use crate::error::{ExtractError, Result};
use crate::extractors::{self, COMPLETE_MARKER};
use crate::manifest::{ManifestStore, TaskRecord, TaskStatus};
use crate::selection::Selection;
use crate::storage::StorageGuard;
use crate::transfer::{FetchedArchive, Transfer};
use mvx_common::bytes::{bytes_to_gb, format_bytes};
use mvx_common::{PerformanceId, SubjectId, Variant};
use std::path::Path;
use tracing::{debug, error, info};

/// How a single task ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Terminal completed state reached this run
    Completed { bytes: u64 },
    /// Durable completion signal found; nothing to do
    Skipped,
    /// Neither archive variant could be obtained
    DownloadFailed,
}

/// Counters for the end-of-run report
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub subjects_processed: u32,
    pub subjects_skipped_storage: u32,
    pub completed: u32,
    pub skipped: u32,
    pub failed: u32,
    pub download_failed: u32,
    pub total_bytes: u64,
}

/// The pipeline driver: owns the transfer wrapper, the manifest ledger and
/// the storage guard for one run
pub struct Orchestrator {
    config: PipelineConfig,
    selection: Selection,
    transfer: Transfer,
    manifest: ManifestStore,
    guard: StorageGuard,
}

impl Orchestrator {
    /// Validate the configuration and prepare the local directories
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        std::fs::create_dir_all(&config.storage.temp_dir)?;
        std::fs::create_dir_all(&config.storage.output_dir)?;

        let selection = Selection::from_config(&config.extraction)?;
        let transfer = Transfer::new(
            config.transfer.clone(),
            config.storage.temp_dir.clone(),
        );
        let manifest = ManifestStore::open(&config.storage.manifest_path)?;
        let guard = StorageGuard::new(config.limits.min_free_space_gb);

        Ok(Self {
            config,
            selection,
            transfer,
            manifest,
            guard,
        })
    }

    pub fn manifest(&self) -> &ManifestStore {
        &self.manifest
    }

    /// Process every configured subject in order
    pub async fn run(&self) -> Result<RunSummary> {
        let subjects = self.config.subjects()?;
        let performances = self.config.performances()?;

        info!(
            subjects = subjects.len(),
            performances_per_subject = performances.len(),
            output = %self.config.storage.output_dir.display(),
            "extraction run starting"
        );

        let mut summary = RunSummary::default();
        for subject in &subjects {
            // One storage check per subject; a failing subject is skipped
            // for this run, not retried.
            if let Err(e) = self.guard.check(&self.config.storage.output_dir) {
                error!(subject = %subject, error = %e, "insufficient storage; skipping subject");
                summary.subjects_skipped_storage += 1;
                continue;
            }

            self.process_subject(subject, &performances, &mut summary)
                .await;
            summary.subjects_processed += 1;
        }

        info!(
            subjects = summary.subjects_processed,
            completed = summary.completed,
            skipped = summary.skipped,
            failed = summary.failed,
            download_failed = summary.download_failed,
            total = %format_bytes(summary.total_bytes),
            "extraction run finished"
        );
        Ok(summary)
    }

    async fn process_subject(
        &self,
        subject: &SubjectId,
        performances: &[PerformanceId],
        summary: &mut RunSummary,
    ) {
        info!(subject = %subject, "processing subject");

        for performance in performances {
            match self.run_task(subject, performance).await {
                Ok(TaskOutcome::Completed { bytes }) => {
                    summary.completed += 1;
                    summary.total_bytes += bytes;
                }
                Ok(TaskOutcome::Skipped) => summary.skipped += 1,
                Ok(TaskOutcome::DownloadFailed) => summary.download_failed += 1,
                Err(e) => {
                    error!(
                        subject = %subject,
                        performance = %performance,
                        error = %e,
                        "task failed"
                    );
                    let mut record = TaskRecord::new(subject, performance, TaskStatus::Failed);
                    record.error = Some(e.to_string());
                    if let Err(me) = self.manifest.upsert(&record) {
                        error!(error = %me, "failed to record task failure");
                    }
                    summary.failed += 1;
                }
            }
        }
    }

    /// One task through its full state machine
    async fn run_task(
        &self,
        subject: &SubjectId,
        performance: &PerformanceId,
    ) -> Result<TaskOutcome> {
        let task_dir = self
            .config
            .storage
            .output_dir
            .join(subject.to_string())
            .join(performance.to_string());
        let force = self.config.processing.force_reextract;

        // Queued: consult the durable completion signals first.
        if !force {
            if self
                .manifest
                .is_completed(subject.as_str(), performance.as_str())?
            {
                info!(subject = %subject, performance = %performance, "already completed per manifest; skipping");
                return Ok(TaskOutcome::Skipped);
            }
            if task_dir.join(COMPLETE_MARKER).exists() {
                info!(subject = %subject, performance = %performance, "completion marker found; skipping");
                self.restore_completed_row(subject, performance, &task_dir)?;
                return Ok(TaskOutcome::Skipped);
            }
        }

        // Downloading: each variant independently, with bounded retries.
        self.manifest
            .upsert(&TaskRecord::new(subject, performance, TaskStatus::Downloading))?;

        let anno = self
            .transfer
            .fetch(subject, performance, Variant::Anno)
            .await?;
        let raw = self
            .transfer
            .fetch(subject, performance, Variant::Raw)
            .await?;

        if anno.is_none() && raw.is_none() {
            let mut record = TaskRecord::new(subject, performance, TaskStatus::DownloadFailed);
            record.error = Some("no archive variant could be downloaded".to_string());
            self.manifest.upsert(&record)?;
            return Ok(TaskOutcome::DownloadFailed);
        }

        // Extracting: blocking container work off the async loop, still one
        // task at a time.
        self.manifest
            .upsert(&TaskRecord::new(subject, performance, TaskStatus::Extracting))?;

        let outcome = {
            let subject = subject.clone();
            let performance = performance.clone();
            let anno_path = anno.as_ref().map(|f| f.path.clone());
            let raw_path = raw.as_ref().map(|f| f.path.clone());
            let task_dir = task_dir.clone();
            let selection = self.selection.clone();
            tokio::task::spawn_blocking(move || {
                extractors::extract_performance(
                    &subject,
                    &performance,
                    anno_path.as_deref(),
                    raw_path.as_deref(),
                    &task_dir,
                    &selection,
                    force,
                )
            })
            .await
            .map_err(|e| ExtractError::Extraction(format!("extraction task panicked: {}", e)))??
        };

        // Verifying: sizes measured, marker already on disk, ledger updated.
        let mut record = TaskRecord::new(subject, performance, TaskStatus::Completed);
        record.cameras_extracted = outcome.cameras_extracted;
        record.frames = outcome.frames;
        record.size_gb = bytes_to_gb(outcome.total_bytes);
        record.anno_size_gb = bytes_to_gb(outcome.anno_bytes);
        record.raw_size_gb = bytes_to_gb(outcome.raw_bytes);
        record.anno_sha256 = anno.as_ref().map(|f| f.sha256.clone());
        record.raw_sha256 = raw.as_ref().map(|f| f.sha256.clone());
        self.manifest.upsert(&record)?;

        info!(
            subject = %subject,
            performance = %performance,
            cameras = outcome.cameras_extracted,
            size = %format_bytes(outcome.total_bytes),
            "task completed"
        );

        // Cleanup: reclaim the local archive copies before the next task.
        if self.config.processing.delete_after_extract {
            self.cleanup_archives([anno, raw].into_iter().flatten());
        }

        Ok(TaskOutcome::Completed {
            bytes: outcome.total_bytes,
        })
    }

    /// A marker without a manifest row means the ledger was lost or moved;
    /// restore a completed row from what is on disk.
    fn restore_completed_row(
        &self,
        subject: &SubjectId,
        performance: &PerformanceId,
        task_dir: &Path,
    ) -> Result<()> {
        if self
            .manifest
            .get(subject.as_str(), performance.as_str())?
            .is_some()
        {
            return Ok(());
        }

        let anno_bytes = extractors::dir_size(&task_dir.join(Variant::Anno.output_subdir()));
        let raw_bytes = extractors::dir_size(&task_dir.join(Variant::Raw.output_subdir()));
        let mut record = TaskRecord::new(subject, performance, TaskStatus::Completed);
        record.size_gb = bytes_to_gb(anno_bytes + raw_bytes);
        record.anno_size_gb = bytes_to_gb(anno_bytes);
        record.raw_size_gb = bytes_to_gb(raw_bytes);
        self.manifest.upsert(&record)
    }

    fn cleanup_archives(&self, fetched: impl Iterator<Item = FetchedArchive>) {
        for archive in fetched {
            match std::fs::remove_file(&archive.path) {
                Ok(()) => debug!(path = %archive.path.display(), "removed local archive copy"),
                Err(e) => {
                    debug!(path = %archive.path.display(), error = %e, "could not remove archive copy")
                }
            }
        }
    }
}
