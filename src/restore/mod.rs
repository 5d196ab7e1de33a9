mod logic;
pub(crate) mod db_restore; // mysql client invocation
pub(crate) mod extract; // site-tree / dump partitioning of the archive
pub(crate) mod remap; // wp-config.php connection rewrite

use crate::config::RestoreConfig;
use crate::errors::Result;

/// Public entry point for the restore process.
pub fn run_restore_flow(restore_config: &RestoreConfig) -> Result<()> {
    logic::perform_restore_orchestration(restore_config)
}
