// wpbackup/src/restore/db_restore.rs
use std::ffi::{OsStr, OsString};
use std::path::Path;
use std::process::Command;
use tracing::info;

use crate::errors::{AppError, Result};
use crate::utils::connection::{Connection, Credentials};
use crate::utils::option_file::OptionFile;
use crate::utils::{find_executable, run_tool};

/// Loads a SQL dump into `connection.database` with the mysql client.
///
/// As with the dump, the password is handed over in an option file inside
/// `secrets_dir` that is removed before this returns.
pub fn load_database(
    mysql_bin: &OsStr,
    connection: &Connection,
    credentials: &Credentials,
    secrets_dir: &Path,
    sql_file_path: &Path,
) -> Result<()> {
    if !sql_file_path.is_file() {
        return Err(AppError::Structure(format!(
            "SQL file for restoration not found: {}",
            sql_file_path.display()
        )));
    }

    let mysql_path = find_executable(mysql_bin)?;
    let option_file = OptionFile::create(secrets_dir, credentials)?;

    info!(
        "Copying database backup in to MySQL ('{}' on {}:{})...",
        connection.database, connection.host, connection.port
    );

    let mut source = OsString::from("source ");
    source.push(sql_file_path);
    source.push(";");

    let mut command = Command::new(&mysql_path);
    command
        .arg(option_file.defaults_arg())
        .arg("-h")
        .arg(&connection.host)
        .arg("-P")
        .arg(connection.port.to_string())
        .arg("-u")
        .arg(&credentials.username)
        .arg(&connection.database)
        .arg("--execute")
        .arg(source);

    run_tool("mysql", &mut command)?;

    info!("Database restoration complete.");
    Ok(())
}
