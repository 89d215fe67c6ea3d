//! store::document
//!
//! In-memory document shared by the reference stores.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::traits::StoreError;
use crate::core::module::Module;
use crate::core::types::{Channel, ModuleId, Repository, RevisionMarker};

/// Current on-disk document version.
pub const DOCUMENT_VERSION: u32 = 1;

/// Every record a reference store holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    pub version: u32,
    #[serde(default)]
    pub repositories: Vec<Repository>,
    /// Modules keyed by id.
    #[serde(default)]
    pub modules: BTreeMap<ModuleId, Module>,
}

impl Default for StoreDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            repositories: Vec::new(),
            modules: BTreeMap::new(),
        }
    }
}

impl StoreDocument {
    fn repository(&self, source: &str) -> Result<&Repository, StoreError> {
        self.repositories
            .iter()
            .find(|r| r.source() == source)
            .ok_or_else(|| StoreError::NotFound(format!("repository {}", source)))
    }

    pub fn upsert_repository(&mut self, mut repository: Repository) {
        match self
            .repositories
            .iter_mut()
            .find(|r| r.source() == repository.source())
        {
            Some(existing) => {
                for previous in existing.channels() {
                    if let Some(channel) = repository.channel_mut(&previous.name) {
                        if channel.revision.is_none() {
                            channel.version = previous.version.clone();
                            channel.revision = previous.revision.clone();
                        }
                    }
                }
                *existing = repository;
            }
            None => self.repositories.push(repository),
        }
    }

    pub fn channel_head(&self, source: &str, channel: &str) -> Result<Channel, StoreError> {
        self.repository(source)?
            .channel(channel)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("channel {} of {}", channel, source)))
    }

    pub fn set_channel_head(
        &mut self,
        source: &str,
        channel: &str,
        version: &str,
        revision: RevisionMarker,
    ) -> Result<(), StoreError> {
        let repo = self
            .repositories
            .iter_mut()
            .find(|r| r.source() == source)
            .ok_or_else(|| StoreError::NotFound(format!("repository {}", source)))?;
        let head = repo
            .channel_mut(channel)
            .ok_or_else(|| StoreError::NotFound(format!("channel {} of {}", channel, source)))?;
        head.version = Some(version.to_string());
        head.revision = Some(revision);
        Ok(())
    }

    pub fn upsert_module(&mut self, module: Module) {
        self.modules.insert(module.id.clone(), module);
    }
}
