//! `mvx inspect` command implementation
//!
//! Opens one container and prints its metadata, capabilities and per-group
//! entry counts. Useful for checking what an archive actually carries before
//! configuring a run.

use crate::commands::init_console_logging;
use crate::error::Result;
use mvx_archive::Archive;
use std::path::PathBuf;

/// Print metadata and entry counts for one archive
pub async fn run(archive_path: PathBuf, verbose: bool) -> Result<()> {
    init_console_logging(verbose)?;

    let archive = Archive::open(&archive_path)?;
    let meta = archive.meta();
    let capabilities = archive.capabilities();

    println!("Archive: {}", archive_path.display());
    println!("  Subject:       {}", meta.subject);
    println!("  Performance:   {}", meta.performance_part);
    println!("  Capture date:  {}", meta.capture_date);
    println!(
        "  Actor:         {} / {} yrs / {:.0} cm / {:.1} kg",
        meta.actor.gender, meta.actor.age, meta.actor.height_cm, meta.actor.weight_kg
    );
    println!(
        "  Rig:           {} cameras, {} frames, {}x{}",
        meta.camera.num_device,
        meta.camera.num_frame,
        meta.camera.resolution[0],
        meta.camera.resolution[1]
    );
    println!(
        "  Captured:      {} cameras present",
        archive.camera_group().len()
    );
    println!(
        "  Capabilities:  expression={} speech={}",
        capabilities.expression, capabilities.speech
    );

    println!();
    println!("Entries:");
    let counts = archive.group_counts();
    if counts.is_empty() {
        println!("  (none)");
    }
    for (group, count) in counts {
        println!("  {:<14} {}", group, count);
    }

    Ok(())
}
