//! 2D and 3D keypoint extraction
//!
//! Keypoints live in the annotation archive. Frames are sampled at the
//! configured stride to bound output volume. 2D landmarks are bundled per
//! camera (`keypoints2d/cam_NN.bin`), 3D landmarks into a single
//! `keypoints3d/all_frames.bin`; both are maps keyed by frame id.

use crate::error::Result;
use crate::extractors::{note_entry_failure, write_bincode, ExtractContext, ModalityReport};
use crate::modality::Modality;
use mvx_archive::{Landmarks2d, Landmarks3d, LANDMARK_CAMERAS};
use std::collections::BTreeMap;
use tracing::{debug, info};

pub fn extract_keypoints2d(ctx: &ExtractContext<'_>) -> Result<ModalityReport> {
    let mut report = ModalityReport::new(Modality::Keypoints2d);

    let Some(archive) = ctx.anno else {
        debug!("no annotation archive; 2d keypoints unavailable");
        return Ok(report);
    };
    let base = ctx.anno_dir.as_path();

    let num_frame = archive.camera_info().num_frame;
    let stride = ctx.selection.keypoint_stride as usize;
    let dir = base.join("keypoints2d");

    let cameras = ctx
        .selection
        .resolve_cameras(archive.camera_info().num_device)
        .into_iter()
        .filter(|camera| LANDMARK_CAMERAS.contains(&camera.index()));

    for camera in cameras {
        let dest = dir.join(format!("cam_{}.bin", camera));
        if dest.exists() {
            report.skipped_existing += 1;
            continue;
        }

        let camera_key = camera.to_string();
        let mut frames: BTreeMap<u32, Landmarks2d> = BTreeMap::new();
        for frame in (0..num_frame).step_by(stride) {
            match archive.keypoints2d(&camera_key, frame) {
                Ok(Some(landmarks)) => {
                    frames.insert(frame, landmarks);
                }
                Ok(None) => report.skipped_missing += 1,
                Err(e) => note_entry_failure(
                    &mut report,
                    &format!("keypoints2d {}/frame {}", camera, frame),
                    &e,
                ),
            }
        }

        if !frames.is_empty() {
            std::fs::create_dir_all(&dir)?;
            write_bincode(&dest, &frames)?;
            report.files_written += 1;
        }
    }

    info!(files = report.files_written, "2d keypoints persisted");
    Ok(report)
}

pub fn extract_keypoints3d(ctx: &ExtractContext<'_>) -> Result<ModalityReport> {
    let mut report = ModalityReport::new(Modality::Keypoints3d);

    let Some(archive) = ctx.anno else {
        debug!("no annotation archive; 3d keypoints unavailable");
        return Ok(report);
    };
    let base = ctx.anno_dir.as_path();

    let dir = base.join("keypoints3d");
    let dest = dir.join("all_frames.bin");
    if dest.exists() {
        report.skipped_existing += 1;
        return Ok(report);
    }

    let num_frame = archive.camera_info().num_frame;
    let stride = ctx.selection.keypoint_stride as usize;

    let mut frames: BTreeMap<u32, Landmarks3d> = BTreeMap::new();
    for frame in (0..num_frame).step_by(stride) {
        match archive.keypoints3d(frame) {
            Ok(Some(landmarks)) => {
                frames.insert(frame, landmarks);
            }
            Ok(None) => report.skipped_missing += 1,
            Err(e) => {
                note_entry_failure(&mut report, &format!("keypoints3d frame {}", frame), &e)
            }
        }
    }

    if !frames.is_empty() {
        std::fs::create_dir_all(&dir)?;
        write_bincode(&dest, &frames)?;
        report.files_written += 1;
        info!(frames = frames.len(), "3d keypoints persisted");
    }
    Ok(report)
}
