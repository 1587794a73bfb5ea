//! Scan mesh and scan mask extraction
//!
//! The dense-reconstruction mesh goes to `scan/mesh.ply`; per-camera scan
//! segmentation masks to `scan_masks/cam_NN.png`. Both exist only on
//! expression performances.

use crate::error::Result;
use crate::extractors::images::write_image;
use crate::extractors::{note_entry_failure, ExtractContext, ModalityReport};
use crate::modality::Modality;
use crate::ply;
use mvx_archive::ImageKind;
use tracing::{debug, info};

pub fn extract_mesh(ctx: &ExtractContext<'_>) -> Result<ModalityReport> {
    let mut report = ModalityReport::new(Modality::Scan);

    let Some(archive) = ctx.anno else {
        debug!("no annotation archive; scan mesh unavailable");
        return Ok(report);
    };

    let dir = ctx.anno_dir.join("scan");
    let dest = dir.join("mesh.ply");
    if dest.exists() {
        report.skipped_existing += 1;
        return Ok(report);
    }

    match archive.scan_mesh()? {
        Some(mesh) => {
            std::fs::create_dir_all(&dir)?;
            ply::write_ply(&dest, &mesh)?;
            report.files_written += 1;
            info!(vertices = mesh.vertices.len(), "scan mesh persisted");
        }
        None => report.skipped_missing += 1,
    }
    Ok(report)
}

pub fn extract_masks(ctx: &ExtractContext<'_>) -> Result<ModalityReport> {
    let mut report = ModalityReport::new(Modality::ScanMasks);

    let Some(archive) = ctx.anno else {
        debug!("no annotation archive; scan masks unavailable");
        return Ok(report);
    };

    let dir = ctx.anno_dir.join("scan_masks");
    let mut dir_ready = dir.exists();

    for camera in ctx
        .selection
        .resolve_cameras(archive.camera_info().num_device)
    {
        let dest = dir.join(format!("cam_{}.png", camera));
        if dest.exists() {
            report.skipped_existing += 1;
            continue;
        }

        match archive.scan_mask(&camera.to_string()) {
            Ok(Some(mask)) => {
                if !dir_ready {
                    std::fs::create_dir_all(&dir)?;
                    dir_ready = true;
                }
                match write_image(&mask, &dest, ImageKind::Mask) {
                    Ok(()) => report.files_written += 1,
                    Err(e) => {
                        note_entry_failure(&mut report, &format!("scan mask {}", camera), &e)
                    }
                }
            }
            Ok(None) => report.skipped_missing += 1,
            Err(e) => note_entry_failure(&mut report, &format!("scan mask {}", camera), &e),
        }
    }

    Ok(report)
}
