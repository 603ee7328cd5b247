mod cli;
mod commands;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use readmesync_core::DaemonContext;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn init_logging(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Invalid log filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr).compact())
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let context = DaemonContext::new();
    let handler_context = context.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted; finishing the current step (Ctrl+C)");
        handler_context.request_shutdown();
    })
    .context("Failed to set Ctrl+C handler")?;

    let config = cli.config.as_deref();

    match &cli.command {
        Commands::Sync => {
            commands::Sync::execute(config).context("Failed to execute sync command")?;
        }
        Commands::SyncFile { path } => {
            commands::SyncFile::execute(config, path).context("Failed to execute sync-file command")?;
        }
        Commands::Cleanup => {
            commands::Cleanup::execute(config).context("Failed to execute cleanup command")?;
        }
        Commands::Status => {
            commands::Status::execute(config).context("Failed to execute status command")?;
        }
        Commands::Mappings => {
            commands::Mappings::execute(config).context("Failed to execute mappings command")?;
        }
        Commands::ListUnlinked => {
            commands::ListUnlinked::execute(config).context("Failed to execute list-unlinked command")?;
        }
        Commands::Conflicts => {
            commands::Conflicts::execute(config).context("Failed to execute conflicts command")?;
        }
        Commands::Daemon => {
            commands::Daemon::execute(config, context.clone()).context("Failed to execute daemon command")?;
        }
    }

    if context.is_shutdown() {
        std::process::exit(130);
    }

    Ok(())
}
