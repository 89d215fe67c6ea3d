//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`Repository`] - A remote module source with its ordered channels
//! - [`Channel`] - A named update track and its latest known version
//! - [`RevisionMarker`] - Commit SHA plus resolved timestamp
//! - [`ModuleId`] - Deterministic module identity
//!
//! # Validation
//!
//! These types enforce validity at construction time. A repository whose
//! default channel is not one of its channels cannot be represented.
//!
//! # Examples
//!
//! ```
//! use modsync::core::types::Repository;
//!
//! let repo = Repository::new(
//!     "https://github.com/acme/modules",
//!     vec!["stable".into(), "beta".into()],
//!     Some("stable".into()),
//! )
//! .unwrap();
//! assert_eq!(repo.default_channel(), Some("stable"));
//!
//! // Default channel must be a member of the channel list
//! assert!(Repository::new("https://github.com/acme/modules", vec!["beta".into()], Some("stable".into())).is_err());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid repository source: {0}")]
    InvalidSource(String),

    #[error("invalid channel name: {0}")]
    InvalidChannel(String),

    #[error("duplicate channel '{0}'")]
    DuplicateChannel(String),

    #[error("default channel '{0}' is not one of the repository channels")]
    UnknownDefaultChannel(String),
}

/// A remote module repository.
///
/// Channels are kept in declaration order and are unique. The default
/// channel, if any, is always one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RepositoryRecord", into = "RepositoryRecord")]
pub struct Repository {
    source: String,
    default: bool,
    channels: Vec<Channel>,
    default_channel: Option<String>,
}

/// Serialized shape of a repository, validated on the way in.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RepositoryRecord {
    source: String,
    #[serde(default)]
    default: bool,
    channels: Vec<Channel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_channel: Option<String>,
}

impl TryFrom<RepositoryRecord> for Repository {
    type Error = TypeError;

    fn try_from(record: RepositoryRecord) -> Result<Self, Self::Error> {
        let mut repo = Repository::with_channels(
            record.source,
            record.channels,
            record.default_channel,
        )?;
        repo.default = record.default;
        Ok(repo)
    }
}

impl From<Repository> for RepositoryRecord {
    fn from(repo: Repository) -> Self {
        Self {
            source: repo.source,
            default: repo.default,
            channels: repo.channels,
            default_channel: repo.default_channel,
        }
    }
}

impl Repository {
    /// Create a repository from channel names.
    ///
    /// # Errors
    ///
    /// - `InvalidSource` if `source` is blank
    /// - `InvalidChannel` / `DuplicateChannel` for bad channel names
    /// - `UnknownDefaultChannel` if the default is not listed
    pub fn new(
        source: impl Into<String>,
        channels: Vec<String>,
        default_channel: Option<String>,
    ) -> Result<Self, TypeError> {
        let channels = channels.into_iter().map(Channel::new).collect();
        Self::with_channels(source, channels, default_channel)
    }

    /// Create a repository from fully populated channel records.
    pub fn with_channels(
        source: impl Into<String>,
        mut channels: Vec<Channel>,
        default_channel: Option<String>,
    ) -> Result<Self, TypeError> {
        let source = source.into();
        if source.trim().is_empty() {
            return Err(TypeError::InvalidSource("source cannot be empty".into()));
        }

        let mut seen = std::collections::HashSet::new();
        for channel in &channels {
            validate_channel_name(&channel.name)?;
            if !seen.insert(channel.name.as_str()) {
                return Err(TypeError::DuplicateChannel(channel.name.clone()));
            }
        }

        if let Some(default) = &default_channel {
            if !seen.contains(default.as_str()) {
                return Err(TypeError::UnknownDefaultChannel(default.clone()));
            }
        }

        for channel in &mut channels {
            channel.default = default_channel.as_deref() == Some(channel.name.as_str());
        }

        Ok(Self {
            source,
            default: false,
            channels,
            default_channel,
        })
    }

    /// Mark this repository as the default module source.
    pub fn into_default(mut self) -> Self {
        self.default = true;
        self
    }

    /// The repository source address.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether this is the default repository.
    pub fn is_default(&self) -> bool {
        self.default
    }

    /// Channels in declaration order.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Look up a channel by name.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    /// Mutable lookup, used by stores recording a new channel head.
    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.name == name)
    }

    /// The designated default channel.
    pub fn default_channel(&self) -> Option<&str> {
        self.default_channel.as_deref()
    }
}

fn validate_channel_name(name: &str) -> Result<(), TypeError> {
    if name.is_empty() {
        return Err(TypeError::InvalidChannel("channel name cannot be empty".into()));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(TypeError::InvalidChannel(format!(
            "'{}' contains whitespace or control characters",
            name
        )));
    }
    Ok(())
}

/// A named update track of a repository.
///
/// The channel name doubles as the git ref queried on the remote host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    #[serde(default)]
    pub default: bool,
    /// Module version declared by the manifest at the last successful sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Revision the stored module was built from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<RevisionMarker>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: false,
            version: None,
            revision: None,
        }
    }
}

/// Commit identity plus the timestamp used for staleness decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionMarker {
    pub sha: String,
    pub timestamp: DateTime<Utc>,
}

impl RevisionMarker {
    /// Build a marker from both commit timestamps.
    ///
    /// The resolved timestamp is the later of the two. Rebased or amended
    /// commits keep their author time but get a fresh committer time.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use modsync::core::types::RevisionMarker;
    ///
    /// let authored = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    /// let committed = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
    /// let marker = RevisionMarker::resolve("abc123", authored, committed);
    /// assert_eq!(marker.timestamp, committed);
    /// ```
    pub fn resolve(
        sha: impl Into<String>,
        author_time: DateTime<Utc>,
        committer_time: DateTime<Utc>,
    ) -> Self {
        Self {
            sha: sha.into(),
            timestamp: author_time.max(committer_time),
        }
    }

    /// Whether `other` points at the same commit.
    pub fn same_revision(&self, other: &RevisionMarker) -> bool {
        self.sha == other.sha
    }
}

/// Deterministic module identity.
///
/// Derived from the repository source, the channel and the identity the
/// manifest declares. Never from a filesystem path, so repeated syncs of the
/// same module converge on one record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleId(String);

impl ModuleId {
    /// Derive the id for a manifest-declared identity.
    ///
    /// # Example
    ///
    /// ```
    /// use modsync::core::types::ModuleId;
    ///
    /// let a = ModuleId::derive("https://github.com/acme/m", "stable", "acme/sensor");
    /// let b = ModuleId::derive("https://github.com/acme/m", "stable", "acme/sensor");
    /// let c = ModuleId::derive("https://github.com/acme/m", "beta", "acme/sensor");
    /// assert_eq!(a, b);
    /// assert_ne!(a, c);
    /// ```
    pub fn derive(source: &str, channel: &str, declared_id: &str) -> Self {
        let mut hasher = Sha256::new();
        for part in [source.trim_end_matches('/'), channel, declared_id] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        Self(hex::encode(hasher.finalize()))
    }

    /// Wrap an id read back from storage.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form for log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
