//! Server configuration loaded from environment variables.

use std::env;
use std::str::FromStr;

use anyhow::Context;

use crate::filter::FilterMode;

/// Default port if not specified via environment variable.
const DEFAULT_PORT: u16 = 3000;

/// Default database if not specified via environment variable.
const DEFAULT_DATABASE_URL: &str = "sqlite:noisemap.db?mode=rwc";

/// Runtime configuration.
///
/// | Env Var                   | Default                       |
/// |---------------------------|-------------------------------|
/// | `NOISEMAP_PORT`           | `3000`                        |
/// | `NOISEMAP_DATABASE_URL`   | `sqlite:noisemap.db?mode=rwc` |
/// | `NOISEMAP_STRICT_FILTERS` | `false`                       |
/// | `NOISEMAP_SAMPLE_REPORTS` | `0`                           |
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub port: u16,

    /// sqlx SQLite URL, or `memory` for the in-process store.
    pub database_url: String,

    /// Reject unrecognized filter values instead of ignoring them.
    pub strict_filters: bool,

    /// Synthetic reports to seed into an empty store at startup.
    pub sample_reports: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            strict_filters: false,
            sample_reports: 0,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Unset or empty variables fall back to defaults; malformed ones are errors.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            port: parse_var(get("NOISEMAP_PORT"), "NOISEMAP_PORT")?.unwrap_or(defaults.port),
            database_url: get("NOISEMAP_DATABASE_URL").unwrap_or(defaults.database_url),
            strict_filters: match get("NOISEMAP_STRICT_FILTERS") {
                Some(raw) => parse_flag(&raw)
                    .with_context(|| format!("NOISEMAP_STRICT_FILTERS={raw:?} is not a boolean"))?,
                None => defaults.strict_filters,
            },
            sample_reports: parse_var(get("NOISEMAP_SAMPLE_REPORTS"), "NOISEMAP_SAMPLE_REPORTS")?
                .unwrap_or(defaults.sample_reports),
        })
    }

    pub fn filter_mode(&self) -> FilterMode {
        FilterMode::from_strict(self.strict_filters)
    }
}

fn parse_var<T>(raw: Option<String>, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.map(|value| {
        value
            .trim()
            .parse()
            .with_context(|| format!("{key}={value:?} is invalid"))
    })
    .transpose()
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
