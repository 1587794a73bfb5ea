//! MVX CLI Library
//!
//! Command-line interface for the multi-view capture extraction pipeline:
//!
//! - **Extraction runs**: download, extract and verify configured capture
//!   units (`mvx run`)
//! - **Progress inspection**: manifest rows and aggregate counts
//!   (`mvx status`)
//! - **Archive inspection**: metadata and entry counts for one container
//!   (`mvx inspect`)

pub mod commands;
pub mod error;

pub use error::{CliError, Result};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// MVX - Multi-view capture extraction pipeline
#[derive(Parser, Debug)]
#[command(name = "mvx")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the extraction pipeline from a configuration file
    Run {
        /// Path to the YAML run configuration
        #[arg(short, long, default_value = "mvx.yaml")]
        config: PathBuf,

        /// Restrict the run to a single subject
        #[arg(long)]
        subject: Option<String>,

        /// Restrict the run to a single performance
        #[arg(long)]
        performance: Option<String>,

        /// Validate the configuration and list planned work without
        /// downloading anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Show manifest rows and aggregate progress
    Status {
        /// Path to the YAML run configuration
        #[arg(short, long, default_value = "mvx.yaml")]
        config: PathBuf,
    },

    /// Print metadata and entry counts for one archive
    Inspect {
        /// Path to a .mvc container
        archive: PathBuf,
    },
}
