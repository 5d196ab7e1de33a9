// wpbackup/src/restore/remap.rs
use tracing::{info, warn};

use crate::errors::Result;
use crate::utils::connection::{Connection, Credentials, DbHost, DEFAULT_MYSQL_PORT};
use crate::wp_config::{DB_HOST, DB_NAME, DB_PASSWORD, DB_USER, WpConfigFile};

/// Connection settings the restore caller asked for. `None` keeps the archived value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
}

/// Points a freshly extracted site at its new database.
///
/// Host and name are either overridden (and written back) or inherited from
/// the archived configuration. A port only applies together with a host; the
/// archived `DB_HOST` is never rewritten on its own. The user and password are always replaced by
/// the admin credentials; archived ones never survive. Changes stay in memory
/// until the caller saves `config`.
pub fn apply_restore_overrides(
    config: &mut WpConfigFile,
    overrides: &ConnectionOverrides,
    admin: &Credentials,
) -> Result<Connection> {
    let db_host = match &overrides.host {
        Some(host) => {
            let db_host = DbHost::new(host.clone(), Some(overrides.port.unwrap_or(DEFAULT_MYSQL_PORT)));
            config.set(DB_HOST, &db_host.to_string())?;
            db_host
        }
        None => {
            if let Some(port) = overrides.port {
                warn!("--db-port {} is ignored without --db-host; using the archived DB_HOST", port);
            }
            DbHost::parse(&config.get(DB_HOST)?)?
        }
    };

    let database = match &overrides.database {
        Some(name) => {
            config.set(DB_NAME, name)?;
            name.clone()
        }
        None => config.get(DB_NAME)?,
    };

    config.set(DB_USER, &admin.username)?;
    config.set(DB_PASSWORD, &admin.password)?;

    let connection = Connection {
        port: db_host.port_or_default(),
        host: db_host.host,
        database,
    };
    info!(
        "Restoring into database '{}' on {}:{} as {}",
        connection.database, connection.host, connection.port, admin.username
    );
    Ok(connection)
}
