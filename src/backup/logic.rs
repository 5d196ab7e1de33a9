// wpbackup/src/backup/logic.rs
use tracing::info;

use crate::backup::archive::{DB_DUMP_ARCNAME, create_site_archive};
use crate::backup::db_dump::dump_database;
use crate::config::BackupConfig;
use crate::errors::{AppError, Result};
use crate::utils::connection::{Connection, Credentials, DbHost};
use crate::utils::{create_working_area, find_executable};
use crate::wp_config::{DB_HOST, DB_NAME, DB_PASSWORD, DB_USER, WP_CONFIG_FILENAME, WpConfigFile};

/// Backup steps, in order:
/// 1. Require `wp-config.php` in the site directory.
/// 2. Read the connection and credentials from it.
/// 3. Dump the database into a fresh working area.
/// 4. Archive the dump and the site tree.
///
/// The working area is removed on return, whatever the outcome.
pub(super) fn perform_backup_orchestration(backup_config: &BackupConfig) -> Result<()> {
    info!("Starting backup of {}...", backup_config.wp_dir.display());

    let wp_config_path = backup_config.wp_dir.join(WP_CONFIG_FILENAME);
    if !wp_config_path.is_file() {
        return Err(AppError::Precondition(format!(
            "{} could not be found at: {}",
            WP_CONFIG_FILENAME,
            wp_config_path.display()
        )));
    }

    let wp_config = WpConfigFile::open(&wp_config_path)?;
    let db_host = DbHost::parse(&wp_config.get(DB_HOST)?)?;
    let connection = Connection {
        port: db_host.port_or_default(),
        host: db_host.host,
        database: wp_config.get(DB_NAME)?,
    };
    let credentials = Credentials {
        username: wp_config.get(DB_USER)?,
        password: wp_config.get(DB_PASSWORD)?,
    };

    find_executable(backup_config.mysqldump_bin.as_os_str())?;

    let working_area = create_working_area()?;
    let dump_path = working_area.path().join(DB_DUMP_ARCNAME);

    dump_database(
        backup_config.mysqldump_bin.as_os_str(),
        &connection,
        &credentials,
        working_area.path(),
        &dump_path,
    )?;

    create_site_archive(&backup_config.wp_dir, &dump_path, &backup_config.archive_path)?;

    info!("Backup complete: {}", backup_config.archive_path.display());
    Ok(())
}
