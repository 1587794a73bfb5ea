//! Task metadata record
//!
//! Writes `metadata/info.json` into the primary source's subtree: actor and
//! rig metadata, what was requested, and which sources were present. Written
//! once; an existing record is left untouched on resume.

use crate::error::Result;
use crate::extractors::{ExtractContext, ModalityReport};
use crate::modality::Modality;
use mvx_archive::{ActorInfo, CameraInfo};
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
struct InfoRecord<'a> {
    subject: String,
    performance: String,
    capture_date: &'a str,
    actor_info: &'a ActorInfo,
    camera_info: &'a CameraInfo,
    total_cameras: u32,
    total_frames: u32,
    cameras_requested: usize,
    extraction_date: String,
    data_sources: DataSources,
}

#[derive(Serialize)]
struct DataSources {
    anno: bool,
    raw: bool,
}

pub fn extract(ctx: &ExtractContext<'_>) -> Result<ModalityReport> {
    let mut report = ModalityReport::new(Modality::Metadata);

    let (archive, base) = ctx.primary();
    let dir = base.join("metadata");
    let dest = dir.join("info.json");
    if dest.exists() {
        report.skipped_existing += 1;
        return Ok(report);
    }

    let requested = ctx
        .selection
        .resolve_cameras(archive.camera_info().num_device);

    let record = InfoRecord {
        subject: ctx.subject.to_string(),
        performance: ctx.performance.to_string(),
        capture_date: archive.capture_date(),
        actor_info: archive.actor_info(),
        camera_info: archive.camera_info(),
        total_cameras: archive.camera_info().num_device,
        total_frames: archive.camera_info().num_frame,
        cameras_requested: requested.len(),
        extraction_date: chrono::Utc::now().to_rfc3339(),
        data_sources: DataSources {
            anno: ctx.anno.is_some(),
            raw: ctx.raw.is_some(),
        },
    };

    std::fs::create_dir_all(&dir)?;
    let file = std::fs::File::create(&dest)?;
    serde_json::to_writer_pretty(file, &record)?;
    report.files_written += 1;

    info!("metadata persisted");
    Ok(report)
}
