//! Per-modality extraction strategies
//!
//! Each extractor is a pure function of (archives, output subtree, selection)
//! that materializes files and returns counts. Two contracts hold everywhere:
//!
//! - destination existence is checked before any decode; that check is the
//!   crash-recovery mechanism, a previous partial run resumes exactly where
//!   it stopped;
//! - a single entry failing to decode is counted and logged, never allowed
//!   to abort the surrounding camera/frame loop.
//!
//! When both archive variants are present, variant-spanning extractors run
//! an independent pass per source into disjoint `from_anno/` and `from_raw/`
//! subtrees; presence in one never short-circuits the other.

pub mod audio;
pub mod calibration;
pub mod images;
pub mod keypoints;
pub mod metadata;
pub mod model;
pub mod scan;
pub mod uv;

use crate::error::{ExtractError, Result};
use crate::modality::Modality;
use crate::selection::Selection;
use mvx_archive::Archive;
use mvx_common::{PerformanceId, SubjectId, Variant};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

/// Sentinel file marking a fully extracted performance
pub const COMPLETE_MARKER: &str = ".extraction_complete";

/// Everything an extractor needs for one task
pub struct ExtractContext<'a> {
    pub subject: &'a SubjectId,
    pub performance: &'a PerformanceId,
    pub anno: Option<&'a Archive>,
    pub raw: Option<&'a Archive>,
    /// Output subtree for the annotation pass
    pub anno_dir: PathBuf,
    /// Output subtree for the raw pass
    pub raw_dir: PathBuf,
    pub selection: &'a Selection,
}

impl<'a> ExtractContext<'a> {
    /// The archive used for metadata and derived-data modalities: annotation
    /// when present, raw otherwise
    pub fn primary(&self) -> (&'a Archive, &Path) {
        match self.anno {
            Some(archive) => (archive, self.anno_dir.as_path()),
            None => (
                self.raw.expect("context holds at least one archive"),
                self.raw_dir.as_path(),
            ),
        }
    }

    /// Present sources with their output subtrees, annotation first
    pub fn sources(&self) -> Vec<(Variant, &'a Archive, &Path)> {
        let mut sources = Vec::new();
        if let Some(archive) = self.anno {
            sources.push((Variant::Anno, archive, self.anno_dir.as_path()));
        }
        if let Some(archive) = self.raw {
            sources.push((Variant::Raw, archive, self.raw_dir.as_path()));
        }
        sources
    }
}

/// Per-modality result counts
#[derive(Debug, Clone)]
pub struct ModalityReport {
    pub modality: Modality,
    /// Artifacts decoded and written this run
    pub files_written: u64,
    /// Artifacts already on disk, left untouched
    pub skipped_existing: u64,
    /// Entries absent from the archive (expected gaps)
    pub skipped_missing: u64,
    /// Entries that failed to decode or write
    pub failed: u64,
}

impl ModalityReport {
    pub fn new(modality: Modality) -> Self {
        Self {
            modality,
            files_written: 0,
            skipped_existing: 0,
            skipped_missing: 0,
            failed: 0,
        }
    }
}

/// Result of one full extraction pass
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub reports: Vec<ModalityReport>,
    /// Requested cameras that are actually present in the archive
    pub cameras_extracted: u32,
    pub frames: u32,
    pub anno_bytes: u64,
    pub raw_bytes: u64,
    pub total_bytes: u64,
}

/// Run every selected modality extractor for one (subject, performance)
///
/// Best-effort: an extractor's internal error is logged and extraction
/// continues with the next modality. An existing completion marker
/// short-circuits the whole pass unless `force` is set. Opening either
/// archive fails hard: a container with broken metadata aborts the task.
pub fn extract_performance(
    subject: &SubjectId,
    performance: &PerformanceId,
    anno_path: Option<&Path>,
    raw_path: Option<&Path>,
    task_dir: &Path,
    selection: &Selection,
    force: bool,
) -> Result<ExtractionOutcome> {
    let anno = anno_path.map(Archive::open).transpose()?;
    let raw = raw_path.map(Archive::open).transpose()?;

    if anno.is_none() && raw.is_none() {
        return Err(ExtractError::Extraction(
            "no archive available to extract from".to_string(),
        ));
    }

    let ctx = ExtractContext {
        subject,
        performance,
        anno: anno.as_ref(),
        raw: raw.as_ref(),
        anno_dir: task_dir.join(Variant::Anno.output_subdir()),
        raw_dir: task_dir.join(Variant::Raw.output_subdir()),
        selection,
    };
    let (primary, _) = ctx.primary();

    let requested = selection.resolve_cameras(primary.camera_info().num_device);
    let cameras_extracted = requested
        .iter()
        .filter(|camera| primary.camera_group().contains(camera))
        .count() as u32;
    let frames = primary.camera_info().num_frame;

    let marker_path = task_dir.join(COMPLETE_MARKER);
    if marker_path.exists() && !force {
        info!(
            subject = %subject,
            performance = %performance,
            "completion marker present; nothing to extract"
        );
        return Ok(finish_outcome(&ctx, Vec::new(), cameras_extracted, frames));
    }

    std::fs::create_dir_all(task_dir)?;
    if ctx.anno.is_some() {
        std::fs::create_dir_all(&ctx.anno_dir)?;
    }
    if ctx.raw.is_some() {
        std::fs::create_dir_all(&ctx.raw_dir)?;
    }

    info!(
        subject = %subject,
        performance = %performance,
        anno = anno_path.is_some(),
        raw = raw_path.is_some(),
        cameras = requested.len(),
        frames,
        "extracting performance"
    );

    let mut reports = Vec::new();
    for modality in Modality::ALL {
        if !selection.wants(modality) {
            continue;
        }
        match (modality.extractor())(&ctx) {
            Ok(report) => {
                info!(
                    modality = %modality,
                    written = report.files_written,
                    existing = report.skipped_existing,
                    missing = report.skipped_missing,
                    failed = report.failed,
                    "modality done"
                );
                reports.push(report);
            }
            Err(e) => {
                // Best-effort: one broken modality must not sink the task.
                error!(modality = %modality, error = %e, "modality extraction failed");
                let mut report = ModalityReport::new(modality);
                report.failed += 1;
                reports.push(report);
            }
        }
    }

    if !marker_path.exists() {
        write_marker(&marker_path, &ctx, cameras_extracted, frames)?;
    }

    Ok(finish_outcome(&ctx, reports, cameras_extracted, frames))
}

fn finish_outcome(
    ctx: &ExtractContext<'_>,
    reports: Vec<ModalityReport>,
    cameras_extracted: u32,
    frames: u32,
) -> ExtractionOutcome {
    let anno_bytes = dir_size(&ctx.anno_dir);
    let raw_bytes = dir_size(&ctx.raw_dir);
    ExtractionOutcome {
        reports,
        cameras_extracted,
        frames,
        anno_bytes,
        raw_bytes,
        total_bytes: anno_bytes + raw_bytes,
    }
}

/// Marker content records what the pass covered; the file is written once
/// and never rewritten, so repeated runs leave the tree byte-identical.
fn write_marker(
    path: &Path,
    ctx: &ExtractContext<'_>,
    cameras_extracted: u32,
    frames: u32,
) -> Result<()> {
    let content = format!(
        "Extraction completed at {}\nSubject: {}\nPerformance: {}\nCameras: {}\nFrames: {}\n",
        chrono::Utc::now().to_rfc3339(),
        ctx.subject,
        ctx.performance,
        cameras_extracted,
        frames,
    );
    std::fs::write(path, content)?;
    Ok(())
}

/// Total size of all files under a directory
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}

/// Serialize a numeric artifact to its binary output file
pub(crate) fn write_bincode<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| ExtractError::Extraction(format!("cannot encode {}: {}", path.display(), e)))?;
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Log-and-count wrapper for per-entry failures inside extraction loops
pub(crate) fn note_entry_failure(
    report: &mut ModalityReport,
    context: &str,
    error: &dyn std::fmt::Display,
) {
    warn!(context, error = %error, "entry extraction failed; continuing");
    report.failed += 1;
}
