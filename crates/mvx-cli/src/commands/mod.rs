//! CLI command implementations

pub mod inspect;
pub mod run;
pub mod status;

use crate::error::{CliError, Result};
use mvx_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::path::PathBuf;

/// Console-only logging for the short query commands
pub(crate) fn init_console_logging(verbose: bool) -> Result<()> {
    let config = LogConfig {
        level: if verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        },
        output: LogOutput::Console,
        ..LogConfig::default()
    };
    init_logging(&config).map_err(|e| CliError::Logging(e.to_string()))
}

/// Console + rotating file logging for extraction runs
pub(crate) fn init_run_logging(log_dir: PathBuf, verbose: bool) -> Result<()> {
    let config = LogConfig {
        level: if verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        },
        output: LogOutput::Both,
        log_dir,
        log_file_prefix: "mvx".to_string(),
    };
    init_logging(&config).map_err(|e| CliError::Logging(e.to_string()))
}
