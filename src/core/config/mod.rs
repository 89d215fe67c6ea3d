//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. The config file
//! 3. CLI flags (not handled here)
//!
//! # Config Locations
//!
//! The first existing file wins:
//! 1. The path passed explicitly (`--config`), which must exist
//! 2. `$MODSYNC_CONFIG` if set
//! 3. `$XDG_CONFIG_HOME/modsync/config.toml`
//! 4. `~/.modsync/config.toml`
//!
//! Without any file the defaults apply.
//!
//! # Example
//!
//! ```no_run
//! use modsync::core::config::Config;
//!
//! let config = Config::load(None).unwrap();
//! println!("API base: {}", config.api_base());
//! println!("Concurrency: {}", config.max_concurrency());
//! ```

pub mod schema;

pub use schema::{FileConfig, RemoteSection, RepositoryEntry, StoreSection, SyncSection};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::types::Repository;
use crate::remote::github::{DEFAULT_API_BASE, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use crate::sync::orchestrator::{OrchestratorOptions, DEFAULT_MAX_CONCURRENCY};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "MODSYNC_CONFIG";

/// Default admitted-job lifetime.
pub const DEFAULT_JOB_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// Default purge period of the job cache.
pub const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: FileConfig,
    /// Path the file was loaded from, if any.
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `explicit` or the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit path is missing, or if a config file
    /// exists but cannot be parsed or fails validation. A missing file in
    /// the standard locations is not an error.
    pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        let candidates = search_paths(
            std::env::var_os(CONFIG_ENV).map(PathBuf::from),
            std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
            dirs::home_dir(),
        );
        match candidates.into_iter().find(|p| p.is_file()) {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    /// Load and validate a specific file.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;
        Ok(Config {
            file,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    // =========================================================================
    // Accessors with defaults
    // =========================================================================

    pub fn api_base(&self) -> &str {
        self.file.remote.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    pub fn user_agent(&self) -> &str {
        self.file
            .remote
            .user_agent
            .as_deref()
            .unwrap_or(DEFAULT_USER_AGENT)
    }

    pub fn timeout(&self) -> Duration {
        self.file
            .remote
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn max_concurrency(&self) -> usize {
        self.file
            .sync
            .max_concurrency
            .unwrap_or(DEFAULT_MAX_CONCURRENCY)
    }

    pub fn job_max_age(&self) -> Duration {
        self.file
            .sync
            .job_max_age_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_JOB_MAX_AGE)
    }

    pub fn purge_interval(&self) -> Duration {
        self.file
            .sync
            .purge_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_PURGE_INTERVAL)
    }

    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            max_concurrency: self.max_concurrency(),
            scratch_dir: self.file.sync.scratch_dir.clone(),
        }
    }

    /// Store document path; `~/.modsync/store.json` by default.
    pub fn store_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.file.store.path {
            Some(path) => Ok(path.clone()),
            None => {
                let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
                Ok(home.join(".modsync").join("store.json"))
            }
        }
    }

    /// Repositories declared in the file, in order.
    pub fn repositories(&self) -> Result<Vec<Repository>, ConfigError> {
        self.file
            .repositories
            .iter()
            .map(RepositoryEntry::to_repository)
            .collect()
    }
}

/// Candidate config files in lookup order.
fn search_paths(
    env_config: Option<PathBuf>,
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(path) = env_config {
        paths.push(path);
    }
    if let Some(xdg) = xdg_config_home {
        paths.push(xdg.join("modsync").join("config.toml"));
    }
    if let Some(home) = home {
        paths.push(home.join(".modsync").join("config.toml"));
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_file() {
        let config = Config::default();
        assert_eq!(config.api_base(), DEFAULT_API_BASE);
        assert_eq!(config.max_concurrency(), DEFAULT_MAX_CONCURRENCY);
        assert_eq!(config.job_max_age(), DEFAULT_JOB_MAX_AGE);
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert!(config.repositories().unwrap().is_empty());
        assert!(config.loaded_from().is_none());
    }

    #[test]
    fn load_from_file_overrides_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(
            &path,
            r#"
            [remote]
            timeout_secs = 5

            [sync]
            max_concurrency = 2
            job_max_age_secs = 120

            [store]
            path = "/srv/modsync/store.json"

            [[repositories]]
            source = "github.com/acme/modules"
            channels = ["stable"]
            "#,
        )
        .unwrap();

        let config = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(config.loaded_from(), Some(path.as_path()));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.orchestrator_options().max_concurrency, 2);
        assert_eq!(config.job_max_age(), Duration::from_secs(120));
        assert_eq!(
            config.store_path().unwrap(),
            PathBuf::from("/srv/modsync/store.json")
        );
        assert_eq!(config.repositories().unwrap().len(), 1);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let err = Config::load(Some(temp.path().join("absent.toml").as_path())).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn invalid_toml_is_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[sync\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn invalid_values_fail_loading() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        fs::write(&path, "[sync]\nmax_concurrency = 0\n").unwrap();
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn search_order() {
        let paths = search_paths(
            Some(PathBuf::from("/env/config.toml")),
            Some(PathBuf::from("/xdg")),
            Some(PathBuf::from("/home/u")),
        );
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/env/config.toml"),
                PathBuf::from("/xdg/modsync/config.toml"),
                PathBuf::from("/home/u/.modsync/config.toml"),
            ]
        );
        assert!(search_paths(None, None, None).is_empty());
    }
}
