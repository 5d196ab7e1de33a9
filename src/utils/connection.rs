// wpbackup/src/utils/connection.rs
use std::fmt;

use crate::errors::{AppError, Result};

pub const DEFAULT_MYSQL_PORT: u16 = 3306;

/// Where a dump is read from or a load is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub host: String,
    pub port: u16,
    pub database: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The `DB_HOST` setting, which carries an optional port as `host:port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbHost {
    pub host: String,
    pub port: Option<u16>,
}

impl DbHost {
    pub fn new(host: impl Into<String>, port: Option<u16>) -> Self {
        DbHost {
            host: host.into(),
            port,
        }
    }

    /// Bracketless values with several colons are bare IPv6 addresses and
    /// carry no port; `[::1]:3307` does.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if !value.starts_with('[') && value.matches(':').count() > 1 {
            return Ok(DbHost::new(value, None));
        }
        match value.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.trim().parse::<u16>().map_err(|_| {
                    AppError::Precondition(format!(
                        "DB_HOST value '{}' does not end in a valid port number",
                        value
                    ))
                })?;
                Ok(DbHost::new(host.trim(), Some(port)))
            }
            None => Ok(DbHost::new(value, None)),
        }
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_MYSQL_PORT)
    }
}

/// Renders the value stored back into `DB_HOST`; the default port is left implicit.
impl fmt::Display for DbHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) if port != DEFAULT_MYSQL_PORT => write!(f, "{}:{}", self.host, port),
            _ => f.write_str(&self.host),
        }
    }
}
