// wpbackup/src/errors.rs
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid usage: {0}")]
    Usage(String),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("{tool} executable not found. Please install it and try again")]
    ToolNotFound {
        tool: String,
        #[source]
        source: which::Error,
    },

    #[error("{tool} failed with {status}\n\n{tool} stdout:\n{stdout}\n\n{tool} stderr:\n{stderr}")]
    ToolFailed {
        tool: String,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },

    #[error("Archive structure is invalid: {0}")]
    Structure(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        AppError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Process exit status for this error category. Operators script on these,
    /// so they must stay stable.
    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Io { .. } => 1,
            AppError::Usage(_) => 2,
            AppError::Precondition(_) => 3,
            AppError::ToolNotFound { .. } => 4,
            AppError::ToolFailed { .. } => 5,
            AppError::Structure(_) => 6,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
