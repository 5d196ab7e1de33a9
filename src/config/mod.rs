// wpbackup/src/config/mod.rs
use clap::builder::NonEmptyStringValueParser;
use clap::{ArgGroup, Parser, ValueEnum};
use std::path::PathBuf;
use tracing::level_filters::LevelFilter;
use tracing::warn;

use crate::errors::{AppError, Result};
use crate::restore::remap::ConnectionOverrides;
use crate::utils::connection::Credentials;

#[derive(Debug, Parser)]
#[command(
    name = "wpbackup",
    version,
    about = "Backup and restore all your self-hosted WordPress content."
)]
#[command(group(ArgGroup::new("mode").required(true).args(["backup", "restore"])))]
pub struct Cli {
    /// Perform a backup
    #[arg(long)]
    pub backup: bool,

    /// Perform a restoration
    #[arg(long, requires_all = ["db_username", "db_password"])]
    pub restore: bool,

    /// Path to the root of the WordPress directory
    #[arg(long, env = "WPBACKUP_WP_DIR", value_name = "PATH")]
    pub wp_dir: PathBuf,

    /// Path and filename of the archive (.tar.gz) to backup to/restore from
    #[arg(long, env = "WPBACKUP_ARCHIVE", value_name = "PATH")]
    pub archive: PathBuf,

    /// Database admin username. Required only for restorations
    #[arg(long, env = "WPBACKUP_DB_USERNAME", value_parser = NonEmptyStringValueParser::new())]
    pub db_username: Option<String>,

    /// Database admin password. Required only for restorations
    #[arg(
        long,
        env = "WPBACKUP_DB_PASSWORD",
        hide_env_values = true,
        value_parser = NonEmptyStringValueParser::new()
    )]
    pub db_password: Option<String>,

    /// Database hostname to restore to. Defaults to the archived DB_HOST
    #[arg(long, env = "WPBACKUP_DB_HOST", value_parser = NonEmptyStringValueParser::new())]
    pub db_host: Option<String>,

    /// Database port to restore to, used with --db-host. Defaults to 3306
    #[arg(long, env = "WPBACKUP_DB_PORT")]
    pub db_port: Option<u16>,

    /// Database name to restore to. Defaults to the archived DB_NAME
    #[arg(long, env = "WPBACKUP_DB_NAME", value_parser = NonEmptyStringValueParser::new())]
    pub db_name: Option<String>,

    /// mysqldump binary used for backups
    #[arg(long, env = "WPBACKUP_MYSQLDUMP_BIN", default_value = "mysqldump", value_name = "PATH")]
    pub mysqldump_bin: PathBuf,

    /// mysql client binary used for restorations
    #[arg(long, env = "WPBACKUP_MYSQL_BIN", default_value = "mysql", value_name = "PATH")]
    pub mysql_bin: PathBuf,

    /// Log level
    #[arg(long, env = "WPBACKUP_LOG_LEVEL", value_enum, ignore_case = true, default_value_t = LogLevel::Critical)]
    pub log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Critical,
    Error,
    #[value(alias = "warn")]
    Warning,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// `critical` has no tracing equivalent; it reports errors only.
    pub fn level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Critical | LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub wp_dir: PathBuf,
    pub archive_path: PathBuf,
    pub mysqldump_bin: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RestoreConfig {
    pub wp_dir: PathBuf,
    pub archive_path: PathBuf,
    pub admin_credentials: Credentials,
    pub overrides: ConnectionOverrides,
    pub mysql_bin: PathBuf,
}

#[derive(Debug, Clone)]
pub enum OperationConfig {
    Backup(BackupConfig),
    Restore(RestoreConfig),
}

impl Cli {
    /// Turns parsed arguments into the configuration of the selected operation.
    ///
    /// Clap already enforces these rules on the command line; they are checked
    /// again here so a `Cli` assembled any other way gets the same usage errors.
    pub fn into_operation(self) -> Result<OperationConfig> {
        if self.backup == self.restore {
            return Err(AppError::Usage(
                "Must specify either --backup or --restore.".to_string(),
            ));
        }

        if self.backup {
            if self.db_username.is_some()
                || self.db_password.is_some()
                || self.db_host.is_some()
                || self.db_port.is_some()
                || self.db_name.is_some()
            {
                warn!("--db-* options only apply to --restore and are ignored for --backup");
            }
            return Ok(OperationConfig::Backup(BackupConfig {
                wp_dir: self.wp_dir,
                archive_path: self.archive,
                mysqldump_bin: self.mysqldump_bin,
            }));
        }

        let (username, password) = match (self.db_username, self.db_password) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => (user, pass),
            _ => {
                return Err(AppError::Usage(
                    "--db-username and --db-password must be included when using --restore."
                        .to_string(),
                ));
            }
        };

        Ok(OperationConfig::Restore(RestoreConfig {
            wp_dir: self.wp_dir,
            archive_path: self.archive,
            admin_credentials: Credentials { username, password },
            overrides: ConnectionOverrides {
                host: self.db_host,
                port: self.db_port,
                database: self.db_name,
            },
            mysql_bin: self.mysql_bin,
        }))
    }
}
