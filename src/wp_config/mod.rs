// wpbackup/src/wp_config/mod.rs
//! Key/value access to the `define('KEY', 'value');` statements of a
//! WordPress `wp-config.php`.
//!
//! Only the value literal of a matching statement is ever rewritten; every
//! other byte of the file is kept as it was read.

use regex::{Captures, Regex};
use std::fs;
use std::io::ErrorKind;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::debug;

use crate::errors::{AppError, Result};

pub const WP_CONFIG_FILENAME: &str = "wp-config.php";

pub const DB_HOST: &str = "DB_HOST";
pub const DB_NAME: &str = "DB_NAME";
pub const DB_USER: &str = "DB_USER";
pub const DB_PASSWORD: &str = "DB_PASSWORD";

/// Stock wp-config.php marker; new definitions are inserted above it.
const STOP_EDITING_MARKER: &str = "That's all, stop editing!";

static DEFINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^[ \t]*define\s*\(\s*(?:'(?P<skey>[^']*)'|"(?P<dkey>[^"]*)")\s*,\s*(?:'(?P<sval>(?:[^'\\]|\\.)*)'|"(?P<dval>(?:[^"\\]|\\.)*)")\s*\)"#,
    )
    .expect("define() pattern is a valid regex")
});

/// Any `define('KEY', ...)` statement, whatever its value expression.
static DEFINE_ANY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^[ \t]*define\s*\(\s*(?:'(?P<skey>[^']*)'|"(?P<dkey>[^"]*)")\s*,"#)
        .expect("define() key pattern is a valid regex")
});

struct Definition {
    value: Range<usize>,
    quote: char,
}

#[derive(Debug, Clone)]
pub struct WpConfigFile {
    path: PathBuf,
    content: String,
}

impl WpConfigFile {
    /// Reads the configuration file. A missing file is a precondition failure.
    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => AppError::Precondition(format!(
                "{} could not be found at: {}",
                WP_CONFIG_FILENAME,
                path.display()
            )),
            _ => AppError::io(path, e),
        })?;
        Ok(Self::from_content(path, content))
    }

    fn from_content(path: &Path, content: String) -> Self {
        WpConfigFile {
            path: path.to_path_buf(),
            content,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Result<String> {
        let def = self.find(key).ok_or_else(|| {
            AppError::Precondition(format!(
                "{} is not defined in {}",
                key,
                self.path.display()
            ))
        })?;
        Ok(unescape(&self.content[def.value.clone()]))
    }

    /// Sets `key` to `value` in memory. Call [`WpConfigFile::save`] to persist.
    ///
    /// A key defined by anything other than a string literal (`getenv(...)`,
    /// a constant) cannot be rewritten in place. A second `define` would be
    /// ignored by PHP, so that is a precondition failure.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match self.find(key) {
            Some(def) => {
                let literal = escape(value, def.quote);
                self.content.replace_range(def.value, &literal);
            }
            None if self.defines(key) => {
                return Err(AppError::Precondition(format!(
                    "{} in {} is not a plain string literal and cannot be rewritten",
                    key,
                    self.path.display()
                )));
            }
            None => {
                let statement = format!("define( '{}', '{}' );\n", key, escape(value, '\''));
                match self.content.find(STOP_EDITING_MARKER) {
                    Some(marker) => {
                        let line_start = self.content[..marker].rfind('\n').map_or(0, |nl| nl + 1);
                        self.content.insert_str(line_start, &statement);
                    }
                    None => {
                        if !self.content.is_empty() && !self.content.ends_with('\n') {
                            self.content.push('\n');
                        }
                        self.content.push_str(&statement);
                    }
                }
            }
        }
        debug!("Set {} in {}", key, self.path.display());
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        fs::write(&self.path, &self.content).map_err(|e| AppError::io(&self.path, e))
    }

    fn defines(&self, key: &str) -> bool {
        DEFINE_ANY_RE
            .captures_iter(&self.content)
            .any(|caps| defined_key(&caps) == Some(key))
    }

    fn find(&self, key: &str) -> Option<Definition> {
        DEFINE_RE
            .captures_iter(&self.content)
            .find(|caps| defined_key(caps) == Some(key))
            .and_then(|caps| {
                caps.name("sval")
                    .map(|m| Definition { value: m.range(), quote: '\'' })
                    .or_else(|| caps.name("dval").map(|m| Definition { value: m.range(), quote: '"' }))
            })
    }
}

fn defined_key<'a>(caps: &Captures<'a>) -> Option<&'a str> {
    caps.name("skey").or_else(|| caps.name("dkey")).map(|m| m.as_str())
}

fn unescape(literal: &str) -> String {
    let mut out = String::with_capacity(literal.len());
    let mut chars = literal.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some(next @ ('\\' | '\'' | '"' | '$')) => out.push(next),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn escape(value: &str, quote: char) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == quote || (quote == '"' && c == '$') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
