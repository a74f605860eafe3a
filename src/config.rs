//! User configuration and database path resolution.
//!
//! Config lives at `~/.worklog/config.json` and is optional; every field has a
//! default. The database path is resolved in order: explicit path (CLI flag),
//! `WORKLOG_DB`, `dbPath` from config, then `~/.worklog/worklog.db`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::export::ExportFormat;

/// Environment variable overriding the database path.
pub const DB_PATH_ENV: &str = "WORKLOG_DB";

const APP_DIR: &str = ".worklog";
const DB_FILE: &str = "worklog.db";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Database file; `~` is not expanded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
    /// Directory for exports written without an explicit `--out`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,
    #[serde(default)]
    pub export_format: ExportFormat,
}

impl Config {
    /// Load `~/.worklog/config.json`, or defaults when there is no such file
    /// (or no home directory to look in).
    pub fn load() -> Result<Config, ConfigError> {
        match config_path() {
            Ok(path) => Self::load_from(&path),
            Err(ConfigError::HomeDirNotFound) => {
                log::warn!("No home directory; using default config");
                Ok(Config::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Load a config file, or defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Pick the database path: `explicit`, then `$WORKLOG_DB`, then `dbPath`,
    /// then the default under the home directory.
    pub fn resolve_db_path(&self, explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let from_env = std::env::var_os(DB_PATH_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        resolve_db_path_with(explicit, from_env, self.db_path.as_deref())
    }

    /// Where an export goes when no output path is given.
    pub fn default_export_path(&self, format: ExportFormat) -> PathBuf {
        let file_name = format.default_file_name();
        match &self.export_dir {
            Some(dir) => dir.join(file_name),
            None => PathBuf::from(file_name),
        }
    }
}

fn resolve_db_path_with(
    explicit: Option<&Path>,
    from_env: Option<PathBuf>,
    from_config: Option<&Path>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = from_env {
        return Ok(path);
    }
    if let Some(path) = from_config {
        return Ok(path.to_path_buf());
    }
    default_db_path()
}

/// `~/.worklog`
pub fn app_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::HomeDirNotFound)?;
    Ok(home.join(APP_DIR))
}

/// `~/.worklog/config.json`
pub fn config_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dir()?.join(CONFIG_FILE))
}

/// `~/.worklog/worklog.db`
pub fn default_db_path() -> Result<PathBuf, ConfigError> {
    Ok(app_dir()?.join(DB_FILE))
}
