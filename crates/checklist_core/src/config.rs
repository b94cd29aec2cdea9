//! Runtime configuration for embedding the core.
//!
//! # Responsibility
//! - Resolve database path and logging settings from explicit values,
//!   environment variables, then defaults.
//!
//! # Invariants
//! - Blank values at any layer are treated as unset.
//! - Resolution never fails; validation happens where values are used.

use crate::logging::default_log_level;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "CHECKLISTS_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "CHECKLISTS_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "CHECKLISTS_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "checklists.sqlite3";
const DEFAULT_LOG_DIR_NAME: &str = "checklists-logs";

/// Resolved settings used to open storage and start logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: PathBuf,
}

/// Caller-provided overrides; `None` falls through to env/defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub db_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_dir: Option<PathBuf>,
}

impl CoreConfig {
    /// Resolves configuration from `overrides`, then process environment.
    pub fn resolve(overrides: ConfigOverrides) -> Self {
        Self::resolve_with(overrides, |key| std::env::var(key).ok())
    }

    /// Resolves configuration with an injectable environment lookup.
    pub fn resolve_with(
        overrides: ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let from_env = |key: &str| env(key).and_then(non_blank);

        let db_path = overrides
            .db_path
            .filter(|path| !path.as_os_str().is_empty())
            .or_else(|| from_env(DB_PATH_ENV).map(PathBuf::from))
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME));
        let log_level = overrides
            .log_level
            .and_then(non_blank)
            .or_else(|| from_env(LOG_LEVEL_ENV))
            .unwrap_or_else(|| default_log_level().to_string());
        let log_dir = overrides
            .log_dir
            .filter(|path| !path.as_os_str().is_empty())
            .or_else(|| from_env(LOG_DIR_ENV).map(PathBuf::from))
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME));

        Self {
            db_path,
            log_level,
            log_dir,
        }
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigOverrides, CoreConfig, DB_PATH_ENV, LOG_LEVEL_ENV};
    use crate::logging::default_log_level;
    use std::path::PathBuf;

    #[test]
    fn overrides_win_over_environment() {
        let overrides = ConfigOverrides {
            db_path: Some(PathBuf::from("/data/override.sqlite3")),
            log_level: Some("warn".to_string()),
            log_dir: None,
        };
        let config = CoreConfig::resolve_with(overrides, |key| match key {
            DB_PATH_ENV => Some("/data/env.sqlite3".to_string()),
            LOG_LEVEL_ENV => Some("trace".to_string()),
            _ => None,
        });
        assert_eq!(config.db_path, PathBuf::from("/data/override.sqlite3"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn blank_environment_falls_back_to_defaults() {
        let config = CoreConfig::resolve_with(ConfigOverrides::default(), |_| {
            Some("   ".to_string())
        });
        assert_eq!(config.log_level, default_log_level());
        assert!(config.db_path.ends_with("checklists.sqlite3"));
        assert!(config.log_dir.ends_with("checklists-logs"));
    }

    #[test]
    fn environment_is_used_when_no_override() {
        let config = CoreConfig::resolve_with(ConfigOverrides::default(), |key| {
            (key == DB_PATH_ENV).then(|| " /srv/checklists.db ".to_string())
        });
        assert_eq!(config.db_path, PathBuf::from("/srv/checklists.db"));
    }
}
