// wpbackup/src/utils/option_file.rs
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use tempfile::{Builder as TempFileBuilder, NamedTempFile};
use tracing::debug;

use crate::errors::{AppError, Result};
use crate::utils::connection::Credentials;

/// A MySQL client option file holding the login for one tool invocation.
///
/// The file is created owner-only inside a caller-chosen directory and is
/// deleted when this value is dropped, whether the invocation succeeded or not.
pub struct OptionFile {
    file: NamedTempFile,
}

impl OptionFile {
    pub fn create(dir: &Path, credentials: &Credentials) -> Result<Self> {
        let mut file = TempFileBuilder::new()
            .prefix(".my-")
            .suffix(".cnf")
            .tempfile_in(dir)
            .map_err(|e| AppError::io(dir, e))?;

        restrict_permissions(&file)?;

        let contents = format!(
            "[client]\nuser=\"{}\"\npassword=\"{}\"\n",
            quote(&credentials.username),
            quote(&credentials.password)
        );
        file.write_all(contents.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| AppError::io(file.path(), e))?;

        debug!("Wrote client option file {}", file.path().display());
        Ok(OptionFile { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// `--defaults-extra-file=<path>`; mysql and mysqldump require it as the first argument.
    pub fn defaults_arg(&self) -> OsString {
        let mut arg = OsString::from("--defaults-extra-file=");
        arg.push(self.file.path());
        arg
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &NamedTempFile) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.as_file()
        .set_permissions(std::fs::Permissions::from_mode(0o600))
        .map_err(|e| AppError::io(file.path(), e))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &NamedTempFile) -> Result<()> {
    Ok(())
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
