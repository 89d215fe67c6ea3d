//! store::memory
//!
//! In-memory [`ModuleStore`] for tests and embedding.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use super::document::StoreDocument;
use super::traits::{ModuleStore, StoreError};
use crate::core::module::Module;
use crate::core::types::{Channel, ModuleId, Repository, RevisionMarker};

/// In-memory store. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreDocument>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `repositories`.
    pub fn with_repositories(repositories: impl IntoIterator<Item = Repository>) -> Self {
        let store = Self::new();
        {
            let mut doc = store.inner.lock().unwrap_or_else(|e| e.into_inner());
            for repo in repositories {
                doc.upsert_repository(repo);
            }
        }
        store
    }

    /// Simulate an unreachable backend: every call fails with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Copy of the current document.
    pub fn snapshot(&self) -> StoreDocument {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn doc(&self) -> Result<MutexGuard<'_, StoreDocument>, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".into()));
        }
        self.inner
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl ModuleStore for MemoryStore {
    async fn list_repositories(&self) -> Result<Vec<Repository>, StoreError> {
        Ok(self.doc()?.repositories.clone())
    }

    async fn upsert_repository(&self, repository: Repository) -> Result<(), StoreError> {
        self.doc()?.upsert_repository(repository);
        Ok(())
    }

    async fn channel_head(&self, source: &str, channel: &str) -> Result<Channel, StoreError> {
        self.doc()?.channel_head(source, channel)
    }

    async fn set_channel_head(
        &self,
        source: &str,
        channel: &str,
        version: &str,
        revision: RevisionMarker,
    ) -> Result<(), StoreError> {
        self.doc()?.set_channel_head(source, channel, version, revision)
    }

    async fn upsert_module(&self, module: Module) -> Result<(), StoreError> {
        self.doc()?.upsert_module(module);
        Ok(())
    }

    async fn get_module(&self, id: &ModuleId) -> Result<Option<Module>, StoreError> {
        Ok(self.doc()?.modules.get(id).cloned())
    }

    async fn list_modules(&self) -> Result<Vec<Module>, StoreError> {
        Ok(self.doc()?.modules.values().cloned().collect())
    }
}
