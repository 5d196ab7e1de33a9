//! WordPress Backup/Restore Tool
//!
//! Packs a site's database dump and directory tree into a single .tar.gz,
//! and redeploys such an archive onto a fresh host.

// wpbackup/src/main.rs
mod backup;
mod config;
mod errors;
mod restore;
mod utils;
mod wp_config;
#[cfg(all(test, unix))]
mod test_support;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Cli, OperationConfig};
use errors::AppError;
use std::process::ExitCode;
use tracing::error;

fn main() -> ExitCode {
    dotenv::dotenv().ok();

    // Usage errors exit here with status 2, before any file is touched.
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(cli.log_level.level_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || match run_app(cli) {
        Ok(()) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    })
}

fn run_app(cli: Cli) -> Result<()> {
    match cli.into_operation()? {
        OperationConfig::Backup(backup_config) => {
            backup::run_backup_flow(&backup_config).context("Backup process failed")?;
        }
        OperationConfig::Restore(restore_config) => {
            restore::run_restore_flow(&restore_config).context("Restore process failed")?;
        }
    }
    Ok(())
}

/// Maps an error to the exit status of its category; anything that is not an
/// [`AppError`] counts as a generic failure.
fn exit_code_for(e: &anyhow::Error) -> u8 {
    e.downcast_ref::<AppError>().map_or(1, AppError::exit_code)
}
