//! Image and mask extraction
//!
//! Runs one pass per available source archive. Output layout:
//! `{source}/images/cam_NN/frame_NNNNNN.jpg` and
//! `{source}/masks/cam_NN/frame_NNNNNN.png`. Camera directories are created
//! lazily on the first written frame, so a camera with no entries leaves no
//! trace in the tree.

use crate::error::Result;
use crate::extractors::{note_entry_failure, ExtractContext, ModalityReport};
use crate::modality::Modality;
use crate::progress;
use image::{DynamicImage, ImageFormat};
use mvx_archive::ImageKind;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

const JPEG_QUALITY: u8 = 95;

pub fn extract_images(ctx: &ExtractContext<'_>) -> Result<ModalityReport> {
    extract_image_like(ctx, Modality::Images)
}

pub fn extract_masks(ctx: &ExtractContext<'_>) -> Result<ModalityReport> {
    extract_image_like(ctx, Modality::Masks)
}

fn extract_image_like(ctx: &ExtractContext<'_>, modality: Modality) -> Result<ModalityReport> {
    let (kind, subdir, ext) = match modality {
        Modality::Masks => (ImageKind::Mask, "masks", "png"),
        _ => (ImageKind::Color, "images", "jpg"),
    };
    let mut report = ModalityReport::new(modality);

    for (variant, archive, base) in ctx.sources() {
        let cameras = ctx.selection.resolve_cameras(archive.camera_info().num_device);
        let num_frame = archive.camera_info().num_frame;

        let pb = progress::create_progress_bar(
            cameras.len() as u64,
            &format!("{} ({})", subdir, variant),
        );

        for camera in cameras {
            if !archive.camera_group().contains(&camera) {
                info!(camera = %camera, variant = %variant, "camera has no entries; skipping");
                pb.inc(1);
                continue;
            }

            let cam_dir = base.join(subdir).join(format!("cam_{}", camera));
            let mut dir_ready = cam_dir.exists();
            let camera_key = camera.to_string();

            for frame in 0..num_frame {
                let dest = cam_dir.join(format!("frame_{:06}.{}", frame, ext));
                // Existence check before decode is the resume mechanism.
                if dest.exists() {
                    report.skipped_existing += 1;
                    continue;
                }

                match archive.image(&camera_key, kind, frame) {
                    Ok(Some(decoded)) => {
                        if !dir_ready {
                            std::fs::create_dir_all(&cam_dir)?;
                            dir_ready = true;
                        }
                        match write_image(&decoded, &dest, kind) {
                            Ok(()) => report.files_written += 1,
                            Err(e) => note_entry_failure(
                                &mut report,
                                &format!("{}/{}/frame {}", variant, camera, frame),
                                &e,
                            ),
                        }
                    }
                    Ok(None) => report.skipped_missing += 1,
                    Err(e) => note_entry_failure(
                        &mut report,
                        &format!("{}/{}/frame {}", variant, camera, frame),
                        &e,
                    ),
                }
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
    }

    Ok(report)
}

/// Encode one artifact: JPEG for color frames, PNG for masks
pub(crate) fn write_image(
    decoded: &DynamicImage,
    dest: &Path,
    kind: ImageKind,
) -> Result<()> {
    match kind {
        ImageKind::Color => {
            let file = std::fs::File::create(dest)?;
            let mut writer = BufWriter::new(file);
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
            decoded
                .write_with_encoder(encoder)
                .map_err(|e| crate::error::ExtractError::Extraction(e.to_string()))?;
        }
        ImageKind::Mask => {
            decoded
                .save_with_format(dest, ImageFormat::Png)
                .map_err(|e| crate::error::ExtractError::Extraction(e.to_string()))?;
        }
    }
    Ok(())
}
