//! store::traits
//!
//! Persistent store interface for repositories, channels and modules.
//!
//! The synchronization pipeline only produces candidate values; records are
//! owned by the store. Every operation is async so database-backed stores
//! can implement it without blocking worker tasks.

use async_trait::async_trait;
use thiserror::Error;

use crate::core::module::Module;
use crate::core::types::{Channel, ModuleId, Repository, RevisionMarker};
use crate::sync::ErrorKind;

/// Errors from store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// The store cannot be reached at all. Aborts a synchronization run.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Store,
        }
    }

    /// Whether the error makes every further store call pointless.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::Unavailable(_))
    }
}

/// Store of repositories, channel heads and modules.
///
/// Implementations must be `Send + Sync`; one store serves every worker task
/// of a run concurrently.
#[async_trait]
pub trait ModuleStore: Send + Sync {
    /// All configured repositories, in insertion order.
    async fn list_repositories(&self) -> Result<Vec<Repository>, StoreError>;

    /// Insert a repository or replace the one with the same source.
    ///
    /// Channel heads already recorded for channels that survive the
    /// replacement are kept.
    async fn upsert_repository(&self, repository: Repository) -> Result<(), StoreError>;

    /// Current head of a channel.
    async fn channel_head(&self, source: &str, channel: &str) -> Result<Channel, StoreError>;

    /// Record the version and revision a channel was last synced to.
    async fn set_channel_head(
        &self,
        source: &str,
        channel: &str,
        version: &str,
        revision: RevisionMarker,
    ) -> Result<(), StoreError>;

    /// Insert or replace a module by id.
    async fn upsert_module(&self, module: Module) -> Result<(), StoreError>;

    async fn get_module(&self, id: &ModuleId) -> Result<Option<Module>, StoreError>;

    /// All modules ordered by id.
    async fn list_modules(&self) -> Result<Vec<Module>, StoreError>;
}
