//! UV texture extraction
//!
//! One JPEG per sampled frame under `uv_textures/`. UV maps are large, so
//! the default stride is the coarsest of the per-frame modalities.

use crate::error::Result;
use crate::extractors::{note_entry_failure, ExtractContext, ModalityReport};
use crate::modality::Modality;
use std::io::BufWriter;
use tracing::debug;

const UV_JPEG_QUALITY: u8 = 90;

pub fn extract(ctx: &ExtractContext<'_>) -> Result<ModalityReport> {
    let mut report = ModalityReport::new(Modality::UvTextures);

    let Some(archive) = ctx.anno else {
        debug!("no annotation archive; uv textures unavailable");
        return Ok(report);
    };

    let dir = ctx.anno_dir.join("uv_textures");
    let mut dir_ready = dir.exists();

    let num_frame = archive.camera_info().num_frame;
    let stride = ctx.selection.uv_stride as usize;

    for frame in (0..num_frame).step_by(stride) {
        let dest = dir.join(format!("frame_{:06}.jpg", frame));
        if dest.exists() {
            report.skipped_existing += 1;
            continue;
        }

        match archive.uv_texture(frame) {
            Ok(Some(texture)) => {
                if !dir_ready {
                    std::fs::create_dir_all(&dir)?;
                    dir_ready = true;
                }
                let file = std::fs::File::create(&dest)?;
                let mut writer = BufWriter::new(file);
                let encoder =
                    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, UV_JPEG_QUALITY);
                match texture.write_with_encoder(encoder) {
                    Ok(()) => report.files_written += 1,
                    Err(e) => {
                        note_entry_failure(&mut report, &format!("uv frame {}", frame), &e)
                    }
                }
            }
            Ok(None) => report.skipped_missing += 1,
            Err(e) => note_entry_failure(&mut report, &format!("uv frame {}", frame), &e),
        }
    }

    Ok(report)
}
