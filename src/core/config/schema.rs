//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Validation
//!
//! Values are validated after parsing: numeric settings must be in range and
//! every `[[repositories]]` entry must form a valid [`Repository`].

use std::collections::HashSet;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::core::types::Repository;

/// Upper bound for `sync.max_concurrency`.
pub const MAX_CONCURRENCY_LIMIT: usize = 64;

/// Configuration file contents.
///
/// # Example
///
/// ```toml
/// [remote]
/// api_base = "https://api.github.com"
/// timeout_secs = 30
///
/// [sync]
/// max_concurrency = 8
/// job_max_age_secs = 3600
///
/// [store]
/// path = "/var/lib/modsync/store.json"
///
/// [[repositories]]
/// source = "https://github.com/acme/modules"
/// default = true
/// channels = ["stable", "beta"]
/// default_channel = "stable"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub remote: RemoteSection,
    pub sync: SyncSection,
    pub store: StoreSection,
    pub repositories: Vec<RepositoryEntry>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.remote.validate()?;
        self.sync.validate()?;

        let mut sources = HashSet::new();
        let mut defaults = 0;
        for entry in &self.repositories {
            let repo = entry.to_repository()?;
            if !sources.insert(repo.source().to_string()) {
                return Err(ConfigError::InvalidValue(format!(
                    "repository '{}' is listed twice",
                    repo.source()
                )));
            }
            if repo.is_default() {
                defaults += 1;
            }
        }
        if defaults > 1 {
            return Err(ConfigError::InvalidValue(
                "at most one repository may be the default".into(),
            ));
        }
        Ok(())
    }
}

/// `[remote]`: repository host settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RemoteSection {
    /// API base URL (GitHub Enterprise or a test server).
    pub api_base: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl RemoteSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(base) = &self.api_base {
            if !(base.starts_with("https://") || base.starts_with("http://")) {
                return Err(ConfigError::InvalidValue(format!(
                    "remote.api_base must be an http(s) URL, got '{}'",
                    base
                )));
            }
        }
        if let Some(agent) = &self.user_agent {
            if agent.trim().is_empty() {
                return Err(ConfigError::InvalidValue(
                    "remote.user_agent cannot be empty".into(),
                ));
            }
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "remote.timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// `[sync]`: pipeline settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SyncSection {
    pub max_concurrency: Option<usize>,
    /// Age after which admitted jobs are forgotten.
    pub job_max_age_secs: Option<u64>,
    pub purge_interval_secs: Option<u64>,
    /// Parent directory for per-unit scratch trees.
    pub scratch_dir: Option<PathBuf>,
}

impl SyncSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(n) = self.max_concurrency {
            if n == 0 || n > MAX_CONCURRENCY_LIMIT {
                return Err(ConfigError::InvalidValue(format!(
                    "sync.max_concurrency must be between 1 and {}, got {}",
                    MAX_CONCURRENCY_LIMIT, n
                )));
            }
        }
        for (key, value) in [
            ("sync.job_max_age_secs", self.job_max_age_secs),
            ("sync.purge_interval_secs", self.purge_interval_secs),
        ] {
            if value == Some(0) {
                return Err(ConfigError::InvalidValue(format!("{} must be positive", key)));
            }
        }
        Ok(())
    }
}

/// `[store]`: persistent store location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub path: Option<PathBuf>,
}

/// One `[[repositories]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RepositoryEntry {
    pub source: String,
    #[serde(default)]
    pub default: bool,
    pub channels: Vec<String>,
    #[serde(default)]
    pub default_channel: Option<String>,
}

impl RepositoryEntry {
    /// Build the validated domain type.
    pub fn to_repository(&self) -> Result<Repository, ConfigError> {
        let repo = Repository::new(
            self.source.clone(),
            self.channels.clone(),
            self.default_channel.clone(),
        )
        .map_err(|e| ConfigError::InvalidValue(format!("repository '{}': {}", self.source, e)))?;
        Ok(if self.default { repo.into_default() } else { repo })
    }
}
