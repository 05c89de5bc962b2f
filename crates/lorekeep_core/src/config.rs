//! Runtime configuration for embedding the core.
//!
//! Storage mode is inferred from which fields are set:
//! - `db_path` set -> file database at that path
//! - `db_path` unset -> in-memory database
//!
//! Logging starts only when `log_dir` is set.

use crate::db::{open_db, open_db_in_memory, DbResult};
use crate::logging::{default_log_level, init_logging};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "LOREKEEP_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "LOREKEEP_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "LOREKEEP_LOG_DIR";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// SQLite file; in-memory when unset.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// `trace|debug|info|warn|error`; build-mode default when unset.
    #[serde(default)]
    pub log_level: Option<String>,
    /// Absolute directory for rolling log files.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Config for a file database at `path`.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Some(path.into()),
            ..Default::default()
        }
    }

    /// Reads `LOREKEEP_*` variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds config from an arbitrary key lookup; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Self {
            db_path: read(ENV_DB_PATH).map(PathBuf::from),
            log_level: read(ENV_LOG_LEVEL),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path.is_none()
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }

    /// Opens and migrates the configured database.
    pub fn open_connection(&self) -> DbResult<Connection> {
        match &self.db_path {
            Some(path) => open_db(path),
            None => open_db_in_memory(),
        }
    }

    /// Starts file logging when `log_dir` is set.
    ///
    /// Returns `Ok(false)` when no directory is configured.
    pub fn init_logging(&self) -> Result<bool, String> {
        let Some(log_dir) = &self.log_dir else {
            return Ok(false);
        };
        let log_dir = log_dir
            .to_str()
            .ok_or_else(|| format!("log_dir `{}` is not valid UTF-8", log_dir.display()))?;
        init_logging(self.log_level(), log_dir)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, ENV_DB_PATH, ENV_LOG_DIR, ENV_LOG_LEVEL};
    use crate::logging::default_log_level;
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[test]
    fn lookup_reads_every_variable_and_ignores_blanks() {
        let vars = HashMap::from([
            (ENV_DB_PATH, " /tmp/lorekeep.db "),
            (ENV_LOG_LEVEL, "warn"),
            (ENV_LOG_DIR, "   "),
        ]);
        let config = CoreConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/lorekeep.db")));
        assert_eq!(config.log_level(), "warn");
        assert_eq!(config.log_dir, None);
        assert!(!config.is_in_memory());
    }

    #[test]
    fn defaults_to_memory_and_build_mode_level() {
        let config = CoreConfig::from_lookup(|_| None);
        assert!(config.is_in_memory());
        assert_eq!(config.log_level(), default_log_level());
        assert_eq!(config.init_logging(), Ok(false));
    }

    #[test]
    fn deserializes_partial_json() {
        let config: CoreConfig =
            serde_json::from_str(r#"{ "db_path": "/data/lorekeep.db" }"#).unwrap();
        assert_eq!(config, CoreConfig::file("/data/lorekeep.db"));
    }

    #[test]
    fn in_memory_connection_is_migrated() {
        let conn = CoreConfig::default().open_connection().unwrap();
        let version: u32 = conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, crate::db::migrations::latest_version());
    }
}
