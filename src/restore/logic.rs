// wpbackup/src/restore/logic.rs
use tracing::info;

use crate::config::RestoreConfig;
use crate::errors::Result;
use crate::restore::db_restore::load_database;
use crate::restore::extract::extract_site_archive;
use crate::restore::remap::apply_restore_overrides;
use crate::utils::{create_working_area, find_executable};
use crate::wp_config::{WP_CONFIG_FILENAME, WpConfigFile};

/// Restore steps, in order:
/// 1. Make sure the mysql client exists before touching the filesystem.
/// 2. Extract the site tree into the (new) site directory and the dump into
///    a fresh working area.
/// 3. Rewrite the extracted `wp-config.php` for the new database.
/// 4. Load the dump using the admin credentials.
pub(super) fn perform_restore_orchestration(restore_config: &RestoreConfig) -> Result<()> {
    info!(
        "Starting restoration of {} into {}",
        restore_config.archive_path.display(),
        restore_config.wp_dir.display()
    );

    find_executable(restore_config.mysql_bin.as_os_str())?;

    let working_area = create_working_area()?;
    let dump_path = extract_site_archive(
        &restore_config.archive_path,
        &restore_config.wp_dir,
        working_area.path(),
    )?;

    let mut wp_config = WpConfigFile::open(&restore_config.wp_dir.join(WP_CONFIG_FILENAME))?;
    let connection = apply_restore_overrides(
        &mut wp_config,
        &restore_config.overrides,
        &restore_config.admin_credentials,
    )?;
    wp_config.save()?;
    info!("Updated {}", wp_config.path().display());

    load_database(
        restore_config.mysql_bin.as_os_str(),
        &connection,
        &restore_config.admin_credentials,
        working_area.path(),
        &dump_path,
    )?;

    info!("Restoration complete.");
    Ok(())
}
