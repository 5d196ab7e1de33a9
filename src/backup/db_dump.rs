// wpbackup/src/backup/db_dump.rs
use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::process::Command;
use tracing::info;

use crate::errors::{AppError, Result};
use crate::utils::connection::{Connection, Credentials};
use crate::utils::option_file::OptionFile;
use crate::utils::{find_executable, run_tool};

/// Dumps `connection.database` with mysqldump and writes the SQL to `dump_path`.
///
/// The password goes through a client option file created in `secrets_dir`,
/// never through argv. The option file is gone by the time this returns.
pub fn dump_database(
    mysqldump_bin: &OsStr,
    connection: &Connection,
    credentials: &Credentials,
    secrets_dir: &Path,
    dump_path: &Path,
) -> Result<()> {
    let mysqldump_path = find_executable(mysqldump_bin)?;
    let option_file = OptionFile::create(secrets_dir, credentials)?;

    info!(
        "Getting database dump of '{}' from {}:{}...",
        connection.database, connection.host, connection.port
    );

    let mut command = Command::new(&mysqldump_path);
    command
        .arg(option_file.defaults_arg())
        .arg("-h")
        .arg(&connection.host)
        .arg("-P")
        .arg(connection.port.to_string())
        .arg("-u")
        .arg(&credentials.username)
        .arg(&connection.database);

    let output = run_tool("mysqldump", &mut command)?;
    drop(option_file);

    info!("Saving database dump to \"{}\"...", dump_path.display());
    fs::write(dump_path, &output.stdout).map_err(|e| AppError::io(dump_path, e))?;

    info!("Database dump complete ({} bytes).", output.stdout.len());
    Ok(())
}
