//! Configuration loading and database path resolution
//!
//! Database path priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing or unreadable config file never aborts startup; the next tier is
//! used instead. Loading reports the problem to the caller rather than
//! logging it, since the subscriber is configured from this file.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable consulted for the database path
pub const DATABASE_ENV_VAR: &str = "GROUPTREE_DATABASE";

/// Environment variable that overrides the config file location
pub const CONFIG_ENV_VAR: &str = "GROUPTREE_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Path to SQLite database file
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load the config file from its default location
    ///
    /// `Ok(None)` when no config file exists. An unreadable file is returned
    /// as `Error::Config` naming the path, so the caller can report it once
    /// logging is up and continue with defaults.
    pub fn load_from_default_location() -> Result<Option<Self>> {
        let Some(path) = locate_config_file()? else {
            return Ok(None);
        };

        Self::load(&path)
            .map(Some)
            .map_err(|e| Error::Config(format!("Ignoring config file {}: {}", path.display(), e)))
    }
}

/// Resolve the database file path
pub fn resolve_database_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.database_path {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_database_path()
}

/// Find the config file for the platform
///
/// An explicit `GROUPTREE_CONFIG` that does not exist is an error; finding
/// nothing in the default locations is not.
fn locate_config_file() -> Result<Option<PathBuf>> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(path);
        return if path.exists() {
            Ok(Some(path))
        } else {
            Err(Error::Config(format!("Config file not found: {:?}", path)))
        };
    }

    let user_config = dirs::config_dir().map(|d| d.join("grouptree").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Ok(Some(path));
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/grouptree/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }
    }

    Ok(None)
}

/// Get OS-dependent default database path
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("grouptree"))
        .unwrap_or_else(|| PathBuf::from("./grouptree_data"))
        .join("grouptree.db")
}
