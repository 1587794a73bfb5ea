//! `mvx run` command implementation
//!
//! Loads the run configuration, applies CLI overrides, and drives the
//! orchestrator to completion. `--dry-run` stops after validation and prints
//! the planned work.

use crate::commands::init_run_logging;
use crate::error::Result;
use mvx_common::bytes::format_bytes;
use mvx_extract::{Orchestrator, PipelineConfig};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

/// Run the extraction pipeline
pub async fn run(
    config_path: PathBuf,
    subject: Option<String>,
    performance: Option<String>,
    dry_run: bool,
    verbose: bool,
) -> Result<()> {
    let mut config = PipelineConfig::load(&config_path)?;

    // CLI overrides narrow the configured set to a single unit.
    if let Some(subject) = subject {
        config.extraction.subjects = vec![subject];
    }
    if let Some(performance) = performance {
        config.extraction.performances = vec![performance];
    }
    config.validate()?;

    init_run_logging(config.storage.log_dir.clone(), verbose)?;

    info!(
        config = %config_path.display(),
        subjects = config.extraction.subjects.len(),
        performances = config.extraction.performances.len(),
        "run configuration loaded"
    );

    if dry_run {
        println!("Dry run - nothing will be downloaded or extracted.");
        println!("Subjects:     {}", config.extraction.subjects.join(", "));
        println!("Performances: {}", config.extraction.performances.join(", "));
        let modalities: Vec<&str> = config
            .extraction
            .modalities
            .iter()
            .map(|m| m.as_str())
            .collect();
        println!("Modalities:   {}", modalities.join(", "));
        println!("Output:       {}", config.storage.output_dir.display());
        return Ok(());
    }

    let started = Instant::now();
    let orchestrator = Orchestrator::new(config)?;
    let summary = orchestrator.run().await?;

    println!("Extraction run finished in {:.0?}.", started.elapsed());
    println!("  Subjects processed: {}", summary.subjects_processed);
    if summary.subjects_skipped_storage > 0 {
        println!(
            "  Subjects skipped (storage): {}",
            summary.subjects_skipped_storage
        );
    }
    println!("  Completed:          {}", summary.completed);
    println!("  Already done:       {}", summary.skipped);
    println!("  Failed:             {}", summary.failed);
    println!("  Download failed:    {}", summary.download_failed);
    println!("  Data extracted:     {}", format_bytes(summary.total_bytes));

    Ok(())
}
