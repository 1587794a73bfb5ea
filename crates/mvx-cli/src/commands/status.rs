//! `mvx status` command implementation
//!
//! Prints the manifest ledger: one line per (subject, performance) plus
//! aggregate counts.

use crate::commands::init_console_logging;
use crate::error::Result;
use mvx_extract::{ManifestStore, PipelineConfig};
use std::path::PathBuf;

/// Show manifest rows and aggregate progress
pub async fn run(config_path: PathBuf, verbose: bool) -> Result<()> {
    init_console_logging(verbose)?;

    let config = PipelineConfig::load(&config_path)?;
    let manifest = ManifestStore::open(&config.storage.manifest_path)?;

    let records = manifest.all()?;
    if records.is_empty() {
        println!("No tasks recorded yet.");
        println!("Run 'mvx run' to start extracting.");
        return Ok(());
    }

    println!(
        "{:<10} {:<14} {:<16} {:>8} {:>8} {:>10}",
        "SUBJECT", "PERFORMANCE", "STATUS", "CAMERAS", "FRAMES", "SIZE (GB)"
    );
    for record in &records {
        println!(
            "{:<10} {:<14} {:<16} {:>8} {:>8} {:>10.2}",
            record.subject,
            record.performance,
            record.status,
            record.cameras_extracted,
            record.frames,
            record.size_gb,
        );
        if let Some(ref error) = record.error {
            println!("           error: {}", error);
        }
    }

    let summary = manifest.summary()?;
    println!();
    println!("Summary:");
    println!("  Completed:       {}", summary.completed);
    println!("  Failed:          {}", summary.failed);
    println!("  Download failed: {}", summary.download_failed);
    println!("  In progress:     {}", summary.in_progress);
    println!("  Total extracted: {:.2} GB", summary.total_size_gb);
    println!("  Manifest:        {}", config.storage.manifest_path.display());

    Ok(())
}
