//! Parametric model frame extraction
//!
//! Expression performances carry per-frame model state (pose, shape,
//! expression, vertices, albedo). Frames are sampled at the configured
//! stride and bundled into `flame/all_frames.bin`. On non-expression
//! performances every accessor call reports absence and nothing is written.

use crate::error::Result;
use crate::extractors::{note_entry_failure, write_bincode, ExtractContext, ModalityReport};
use crate::modality::Modality;
use mvx_archive::ModelFrame;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub fn extract(ctx: &ExtractContext<'_>) -> Result<ModalityReport> {
    let mut report = ModalityReport::new(Modality::Flame);

    let Some(archive) = ctx.anno else {
        debug!("no annotation archive; model parameters unavailable");
        return Ok(report);
    };

    let dir = ctx.anno_dir.join("flame");
    let dest = dir.join("all_frames.bin");
    if dest.exists() {
        report.skipped_existing += 1;
        return Ok(report);
    }

    let num_frame = archive.camera_info().num_frame;
    let stride = ctx.selection.model_stride as usize;

    let mut frames: BTreeMap<u32, ModelFrame> = BTreeMap::new();
    for frame in (0..num_frame).step_by(stride) {
        match archive.model_frame(frame) {
            Ok(Some(model)) => {
                frames.insert(frame, model);
            }
            Ok(None) => report.skipped_missing += 1,
            Err(e) => note_entry_failure(&mut report, &format!("model frame {}", frame), &e),
        }
    }

    if !frames.is_empty() {
        std::fs::create_dir_all(&dir)?;
        write_bincode(&dest, &frames)?;
        report.files_written += 1;
        info!(frames = frames.len(), "model parameters persisted");
    }
    Ok(report)
}
