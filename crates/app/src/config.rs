//! Process configuration, read once from the environment.

use std::path::PathBuf;

use anyhow::Context;
use stocktake_infra::PersistenceMode;
use stocktake_observability::LogFormat;

pub const DB_PATH_VAR: &str = "STOCKTAKE_DB_PATH";
pub const EXPORT_DIR_VAR: &str = "STOCKTAKE_EXPORT_DIR";
pub const PERSISTENCE_VAR: &str = "STOCKTAKE_PERSISTENCE";
pub const LOG_FORMAT_VAR: &str = "STOCKTAKE_LOG_FORMAT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// SQLite file backing the inventory store.
    pub db_path: PathBuf,
    /// Where `save` without a path writes reports.
    pub export_dir: PathBuf,
    pub persistence: PersistenceMode,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Malformed values fall back to
    /// their default with a warning; only an unresolvable data directory fails.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = match non_empty(DB_PATH_VAR) {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };

        let export_dir = non_empty(EXPORT_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let persistence = match non_empty(PERSISTENCE_VAR) {
            None => PersistenceMode::default(),
            Some(raw) => parse_persistence(&raw).unwrap_or_else(|| {
                tracing::warn!(value = %raw, "{PERSISTENCE_VAR} not recognised; using write-through");
                PersistenceMode::default()
            }),
        };

        let log_format = match non_empty(LOG_FORMAT_VAR) {
            None => LogFormat::default(),
            Some(raw) => raw.parse().unwrap_or_else(|err| {
                tracing::warn!(%err, "{LOG_FORMAT_VAR} not recognised; using pretty");
                LogFormat::default()
            }),
        };

        Ok(Self {
            db_path,
            export_dir,
            persistence,
            log_format,
        })
    }
}

fn parse_persistence(raw: &str) -> Option<PersistenceMode> {
    match raw.trim().to_ascii_lowercase().replace('_', "-").as_str() {
        "write-through" | "sync" => Some(PersistenceMode::WriteThrough),
        "write-behind" | "async" => Some(PersistenceMode::WriteBehind),
        _ => None,
    }
}

/// `<data_dir>/stocktake/inventory.db`, falling back to `~/.local/share`.
fn default_db_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve app data directory - tried data_dir() and home_dir()/.local/share")?;

    Ok(base.join("stocktake").join("inventory.db"))
}
