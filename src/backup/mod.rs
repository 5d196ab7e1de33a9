mod logic;
pub(crate) mod archive; // two-root tarball creation
pub(crate) mod db_dump; // mysqldump invocation

use crate::config::BackupConfig;
use crate::errors::Result;

/// Public entry point for the backup process.
pub fn run_backup_flow(backup_config: &BackupConfig) -> Result<()> {
    logic::perform_backup_orchestration(backup_config)
}
