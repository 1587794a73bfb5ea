//! Calibration extraction
//!
//! Persists `calibration/all_cameras.bin` plus one `cam_NN.bin` per camera.
//! Only cameras confirmed present in the archive's camera group are written:
//! the calibration table routinely covers cameras that never captured the
//! performance, and those entries must not leak into the output.

use crate::error::Result;
use crate::extractors::{write_bincode, ExtractContext, ModalityReport};
use crate::modality::Modality;
use mvx_archive::CameraCalibration;
use mvx_common::CameraId;
use std::collections::BTreeMap;
use tracing::{debug, info};

pub fn extract(ctx: &ExtractContext<'_>) -> Result<ModalityReport> {
    let mut report = ModalityReport::new(Modality::Calibration);

    // Annotation archive preferred; raw carries the same table otherwise.
    let (archive, base) = ctx.primary();
    let table = archive.all_calibrations()?;

    let requested = ctx.selection.resolve_cameras(archive.camera_info().num_device);
    let mut present: BTreeMap<CameraId, CameraCalibration> = BTreeMap::new();
    for camera in &requested {
        if !archive.camera_group().contains(camera) {
            debug!(camera = %camera, "requested camera absent from camera group; not persisted");
            report.skipped_missing += 1;
            continue;
        }
        match table.get(camera) {
            Some(calib) => {
                present.insert(*camera, calib.clone());
            }
            None => {
                debug!(camera = %camera, "camera captured but has no calibration entry");
                report.skipped_missing += 1;
            }
        }
    }

    let calib_dir = base.join("calibration");
    std::fs::create_dir_all(&calib_dir)?;

    let all_path = calib_dir.join("all_cameras.bin");
    if all_path.exists() {
        report.skipped_existing += 1;
    } else {
        write_bincode(&all_path, &present)?;
        report.files_written += 1;
    }

    for (camera, calib) in &present {
        let path = calib_dir.join(format!("cam_{}.bin", camera));
        if path.exists() {
            report.skipped_existing += 1;
        } else {
            write_bincode(&path, calib)?;
            report.files_written += 1;
        }
    }

    info!(cameras = present.len(), "calibration persisted");
    Ok(report)
}
