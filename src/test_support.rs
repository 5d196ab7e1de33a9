// wpbackup/src/test_support.rs
//! Shell stand-ins for `mysqldump` and `mysql` that record how they were called.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const RECORD: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
name="$(basename "$0")"
: > "$dir/$name.args"
for arg in "$@"; do
    printf '%s\n' "$arg" >> "$dir/$name.args"
done
cat "${1#--defaults-extra-file=}" > "$dir/$name.cnf"
"#;

const MYSQLDUMP_OK: &str = "cat <<'SQL'\n-- MySQL dump\nCREATE TABLE wp_posts (ID bigint);\nINSERT INTO wp_posts VALUES (1);\nSQL\nexit 0\n";

const MYSQL_OK: &str = r#"for last in "$@"; do :; done
sql="${last#source }"
sql="${sql%;}"
cat "$sql" > "$dir/$name.sql"
exit 0
"#;

const FAIL: &str = "echo 'ERROR 1045 (28000): Access denied for user' >&2\nexit 2\n";

pub struct FakeTools {
    dir: TempDir,
}

impl FakeTools {
    pub const DUMP_SQL: &'static str =
        "-- MySQL dump\nCREATE TABLE wp_posts (ID bigint);\nINSERT INTO wp_posts VALUES (1);\n";

    pub fn new() -> anyhow::Result<Self> {
        Self::with_bodies(MYSQLDUMP_OK, MYSQL_OK)
    }

    pub fn failing() -> anyhow::Result<Self> {
        Self::with_bodies(FAIL, FAIL)
    }

    fn with_bodies(mysqldump: &str, mysql: &str) -> anyhow::Result<Self> {
        let dir = tempfile::Builder::new().prefix("fake_mysql_").tempdir()?;
        write_script(&dir.path().join("mysqldump"), mysqldump)?;
        write_script(&dir.path().join("mysql"), mysql)?;
        Ok(FakeTools { dir })
    }

    pub fn mysqldump(&self) -> PathBuf {
        self.dir.path().join("mysqldump")
    }

    pub fn mysql(&self) -> PathBuf {
        self.dir.path().join("mysql")
    }

    pub fn was_invoked(&self, tool: &str) -> bool {
        self.dir.path().join(format!("{}.args", tool)).exists()
    }

    pub fn recorded_args(&self, tool: &str) -> anyhow::Result<Vec<String>> {
        let raw = fs::read_to_string(self.dir.path().join(format!("{}.args", tool)))?;
        Ok(raw.lines().map(str::to_string).collect())
    }

    pub fn recorded_options(&self, tool: &str) -> anyhow::Result<String> {
        Ok(fs::read_to_string(self.dir.path().join(format!("{}.cnf", tool)))?)
    }

    /// The SQL that the fake `mysql` was asked to source.
    pub fn loaded_sql(&self) -> anyhow::Result<String> {
        Ok(fs::read_to_string(self.dir.path().join("mysql.sql"))?)
    }
}

fn write_script(path: &Path, body: &str) -> anyhow::Result<()> {
    fs::write(path, format!("{}{}", RECORD, body))?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    Ok(())
}

/// A minimal site tree with a wp-config.php pointing at `db_host`/`db_name`.
pub fn write_site(site_dir: &Path, db_host: &str, db_name: &str) -> anyhow::Result<()> {
    fs::create_dir_all(site_dir.join("wp-content/uploads/2024"))?;
    fs::create_dir_all(site_dir.join("wp-includes"))?;
    fs::write(
        site_dir.join("wp-config.php"),
        format!(
            "<?php\ndefine( 'DB_NAME', '{}' );\ndefine( 'DB_USER', 'site_user' );\ndefine( 'DB_PASSWORD', 'site_pass' );\ndefine( 'DB_HOST', '{}' );\n$table_prefix = 'wp_';\n/* That's all, stop editing! Happy publishing. */\nrequire_once ABSPATH . 'wp-settings.php';\n",
            db_name, db_host
        ),
    )?;
    fs::write(site_dir.join("index.php"), "<?php require __DIR__ . '/wp-blog-header.php';\n")?;
    fs::write(site_dir.join("wp-includes/version.php"), "<?php $wp_version = '6.4.3';\n")?;
    fs::write(site_dir.join("wp-content/uploads/2024/logo.png"), [0x89u8, b'P', b'N', b'G', 0, 1, 2, 3])?;
    fs::set_permissions(site_dir.join("wp-config.php"), fs::Permissions::from_mode(0o640))?;
    Ok(())
}
