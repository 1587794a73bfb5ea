//! Audio extraction
//!
//! Both archive variants are checked independently; whichever carries audio
//! writes a playable `audio/audio.wav` plus the raw samples as
//! `audio/samples.bin` into its own subtree.

use crate::error::Result;
use crate::extractors::{note_entry_failure, write_bincode, ExtractContext, ModalityReport};
use crate::modality::Modality;
use crate::wav;
use tracing::info;

pub fn extract(ctx: &ExtractContext<'_>) -> Result<ModalityReport> {
    let mut report = ModalityReport::new(Modality::Audio);

    for (variant, archive, base) in ctx.sources() {
        match archive.audio() {
            Ok(Some(clip)) => {
                let dir = base.join("audio");
                std::fs::create_dir_all(&dir)?;

                let wav_path = dir.join("audio.wav");
                if wav_path.exists() {
                    report.skipped_existing += 1;
                } else {
                    wav::write_wav_pcm16(&wav_path, clip.sample_rate, &clip.samples)?;
                    report.files_written += 1;
                }

                let samples_path = dir.join("samples.bin");
                if samples_path.exists() {
                    report.skipped_existing += 1;
                } else {
                    write_bincode(&samples_path, &clip)?;
                    report.files_written += 1;
                }

                info!(
                    variant = %variant,
                    seconds = clip.samples.len() as f64 / clip.sample_rate as f64,
                    "audio persisted"
                );
            }
            Ok(None) => report.skipped_missing += 1,
            Err(e) => note_entry_failure(&mut report, &format!("audio ({})", variant), &e),
        }
    }

    Ok(report)
}
