//! Process-wide settings.
//!
//! [`Settings`] is a loosely typed key/value bag, the shape settings have
//! before anyone has checked them. Values come from a TOML file, a TOML
//! string, the environment, or plain code:
//!
//! ```rust
//! use vigil::Settings;
//!
//! let settings = Settings::new()
//!     .with("referrer_policy", "same-origin")
//!     .with("expect_ct_max_age", 86_400_i64);
//! ```
//!
//! Nothing here validates anything. Turning settings into a typed
//! [`SecurityConfig`](crate::SecurityConfig) is the middleware's job, and it
//! happens exactly once.

use std::path::Path;

use toml::{Table, Value};
use tracing::{debug, warn};

use crate::error::ConfigError;

// ── Known keys ────────────────────────────────────────────────────────────────

/// How an environment variable is typed before it lands in [`Settings`].
#[derive(Clone, Copy)]
enum Kind {
    Str,
    Int,
    Bool,
    /// `HEADER,value`, split on the first comma.
    Pair,
}

/// Every setting vigil reads from the environment, with its expected type.
const ENV_KEYS: &[(&str, Kind)] = &[
    ("REFERRER_POLICY",                Kind::Str),
    ("EXPECT_CT_MAX_AGE",              Kind::Int),
    ("EXPECT_CT_ENFORCE",              Kind::Bool),
    ("EXPECT_CT_REPORT_URI",           Kind::Str),
    ("SECURE_HSTS_SECONDS",            Kind::Int),
    ("SECURE_HSTS_INCLUDE_SUBDOMAINS", Kind::Bool),
    ("SECURE_HSTS_PRELOAD",            Kind::Bool),
    ("SECURE_CONTENT_TYPE_NOSNIFF",    Kind::Bool),
    ("SECURE_BROWSER_XSS_FILTER",      Kind::Bool),
    ("SECURE_PROXY_SSL_HEADER",        Kind::Pair),
    ("X_FRAME_OPTIONS",                Kind::Str),
];

const TRUTHY: &[&str] = &["true", "on", "ok", "y", "yes", "1"];
const FALSY: &[&str] = &["false", "off", "n", "no", "0"];

// ── Settings ──────────────────────────────────────────────────────────────────

/// Unvalidated settings, keyed case-insensitively.
#[derive(Clone, Debug, Default)]
pub struct Settings {
    values: Table,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing any previous value. Returns `self` for chaining.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_ascii_lowercase(), value.into());
        self
    }

    /// Parses a TOML document. Top-level keys become settings.
    pub fn from_toml(source: &str) -> Result<Self, ConfigError> {
        let table: Table = source.parse()?;
        let values = table
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        Ok(Self { values })
    }

    /// Reads and parses a TOML settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let settings = Self::from_toml(&source)?;
        debug!(path = %path.display(), keys = settings.values.len(), "settings loaded");
        Ok(settings)
    }

    /// Reads the known settings from a `.env` file, if one is found in the
    /// current directory or its parents, and then from the process
    /// environment. Process variables win over the file.
    pub fn from_env() -> Self {
        let mut vars = match dotenvy::dotenv_iter() {
            Ok(iter) => dotenv_vars(iter),
            Err(e) if e.not_found() => Vec::new(),
            Err(e) => {
                warn!("ignoring unreadable .env file: {e}");
                Vec::new()
            }
        };
        vars.extend(std::env::vars());
        Self::from_vars(vars)
    }

    /// Like [`from_env`](Settings::from_env), but the env file is `path` and
    /// must exist.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let iter = dotenvy::from_path_iter(path).map_err(|source| ConfigError::EnvFile {
            path: path.to_owned(),
            source,
        })?;
        let mut vars = Vec::new();
        for item in iter {
            vars.push(item.map_err(|source| ConfigError::EnvFile {
                path: path.to_owned(),
                source,
            })?);
        }
        debug!(path = %path.display(), vars = vars.len(), "env file loaded");
        vars.extend(std::env::vars());
        Ok(Self::from_vars(vars))
    }

    /// Reads the known settings from `(NAME, value)` pairs.
    ///
    /// Integer and boolean settings are parsed here. A value that does not
    /// parse is kept as a string, so validation later reports the setting as
    /// having the wrong type instead of silently dropping it. Unknown names
    /// are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut values = Table::new();
        for (name, raw) in vars {
            let Some(&(key, kind)) = ENV_KEYS.iter().find(|(k, _)| *k == name.as_ref()) else {
                continue;
            };
            values.insert(key.to_ascii_lowercase(), typed(kind, raw.into()));
        }
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(&key.to_ascii_lowercase())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Collects the lines of a discovered `.env` file, skipping ones that do not parse.
fn dotenv_vars<R: std::io::Read>(iter: dotenvy::Iter<R>) -> Vec<(String, String)> {
    iter.filter_map(|item| match item {
        Ok(pair) => Some(pair),
        Err(e) => {
            warn!("skipping malformed .env line: {e}");
            None
        }
    })
    .collect()
}

fn typed(kind: Kind, raw: String) -> Value {
    match kind {
        Kind::Str => Value::String(raw),
        Kind::Int => raw
            .trim()
            .parse::<i64>()
            .map_or(Value::String(raw), Value::Integer),
        Kind::Bool => {
            let word = raw.trim().to_ascii_lowercase();
            if TRUTHY.contains(&word.as_str()) {
                Value::Boolean(true)
            } else if FALSY.contains(&word.as_str()) {
                Value::Boolean(false)
            } else {
                Value::String(raw)
            }
        }
        Kind::Pair => match raw.split_once(',') {
            Some((name, value)) => Value::Array(vec![
                Value::String(name.trim().to_owned()),
                Value::String(value.trim().to_owned()),
            ]),
            None => Value::String(raw),
        },
    }
}
