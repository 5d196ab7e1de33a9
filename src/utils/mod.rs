pub mod connection;
pub mod option_file;

use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::{Builder as TempFileBuilder, TempDir};
use tracing::{debug, info};
use which::which;

use crate::errors::{AppError, Result};

/// Resolves a tool on PATH (or checks an explicit path) before anything is mutated.
pub fn find_executable(tool: &OsStr) -> Result<PathBuf> {
    which(tool).map_err(|source| AppError::ToolNotFound {
        tool: tool.to_string_lossy().into_owned(),
        source,
    })
}

/// Creates the per-operation temporary directory. It is removed, with
/// everything staged in it, when the returned handle is dropped.
pub fn create_working_area() -> Result<TempDir> {
    let dir = TempFileBuilder::new()
        .prefix("wpbackup_")
        .tempdir()
        .map_err(|e| AppError::io(std::env::temp_dir(), e))?;
    info!("Working area: {}", dir.path().display());
    Ok(dir)
}

/// Runs `command` to completion, capturing stdout and stderr.
///
/// A non-zero exit becomes [`AppError::ToolFailed`] carrying both streams.
pub fn run_tool(tool: &str, command: &mut Command) -> Result<Output> {
    debug!("Running {:?}", command);

    let output = command
        .output()
        .map_err(|e| AppError::io(command.get_program(), e))?;

    if !output.status.success() {
        return Err(AppError::ToolFailed {
            tool: tool.to_string(),
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(output)
}
