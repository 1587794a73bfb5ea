//! MVX CLI - Main entry point

use clap::Parser;
use mvx_cli::{Cli, Commands};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = execute_command(&cli).await;

    if let Err(e) = result {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> mvx_cli::Result<()> {
    match &cli.command {
        Commands::Run {
            config,
            subject,
            performance,
            dry_run,
        } => {
            mvx_cli::commands::run::run(
                config.clone(),
                subject.clone(),
                performance.clone(),
                *dry_run,
                cli.verbose,
            )
            .await
        }

        Commands::Status { config } => {
            mvx_cli::commands::status::run(config.clone(), cli.verbose).await
        }

        Commands::Inspect { archive } => {
            mvx_cli::commands::inspect::run(archive.clone(), cli.verbose).await
        }
    }
}
