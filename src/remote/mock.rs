//! remote::mock
//!
//! In-memory repository host for deterministic testing.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use modsync::core::types::RevisionMarker;
//! use modsync::remote::mock::MockHost;
//! use modsync::remote::RepositoryHost;
//!
//! # tokio_test::block_on(async {
//! let host = MockHost::new();
//! let rev = RevisionMarker::resolve("abc", Utc::now(), Utc::now());
//! host.publish("acme", "sensor", "stable", rev.clone(), b"archive".to_vec());
//!
//! assert_eq!(host.get_last_commit("acme", "sensor", "stable").await.unwrap(), rev);
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::traits::{ArchiveStream, MemoryBody, RemoteError, RepositoryHost};
use crate::core::types::RevisionMarker;

/// Chunk size used when streaming mock archives.
const CHUNK_SIZE: usize = 8 * 1024;

/// Mock host for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>`; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockHost {
    inner: Arc<Mutex<MockHostInner>>,
}

#[derive(Debug, Default)]
struct MockHostInner {
    /// Published refs keyed by `owner/repo@ref`.
    refs: HashMap<String, Published>,
    /// Injected failures keyed by `owner/repo`.
    failures: HashMap<String, Vec<FailOn>>,
    operations: Vec<MockOperation>,
}

#[derive(Debug, Clone)]
struct Published {
    revision: RevisionMarker,
    archive: Vec<u8>,
}

/// Which operation should fail, and how.
#[derive(Debug, Clone)]
pub enum FailOn {
    LastCommit(RemoteError),
    Archive(RemoteError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    LastCommit {
        owner: String,
        repo: String,
        reference: String,
    },
    Archive {
        owner: String,
        repo: String,
        reference: String,
    },
}

fn repo_key(owner: &str, repo: &str) -> String {
    format!("{}/{}", owner, repo)
}

fn ref_key(owner: &str, repo: &str, reference: &str) -> String {
    format!("{}/{}@{}", owner, repo, reference)
}

impl MockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish (or replace) the head of `reference`.
    pub fn publish(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
        revision: RevisionMarker,
        archive: Vec<u8>,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .refs
            .insert(ref_key(owner, repo, reference), Published { revision, archive });
    }

    /// Make an operation against `owner/repo` fail on every call.
    pub fn fail_on(&self, owner: &str, repo: &str, failure: FailOn) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .failures
            .entry(repo_key(owner, repo))
            .or_default()
            .push(failure);
    }

    pub fn clear_failures(&self) {
        self.inner.lock().unwrap().failures.clear();
    }

    /// All operations in call order.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.inner.lock().unwrap().operations.clone()
    }

    /// Number of archive downloads so far.
    pub fn archive_downloads(&self) -> usize {
        self.operations()
            .iter()
            .filter(|op| matches!(op, MockOperation::Archive { .. }))
            .count()
    }

    fn injected(
        inner: &MockHostInner,
        owner: &str,
        repo: &str,
        pick: impl Fn(&FailOn) -> Option<&RemoteError>,
    ) -> Option<RemoteError> {
        inner
            .failures
            .get(&repo_key(owner, repo))
            .and_then(|list| list.iter().find_map(|f| pick(f).cloned()))
    }
}

#[async_trait]
impl RepositoryHost for MockHost {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_last_commit(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> Result<RevisionMarker, RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(MockOperation::LastCommit {
            owner: owner.to_string(),
            repo: repo.to_string(),
            reference: reference.to_string(),
        });

        if let Some(err) = Self::injected(&inner, owner, repo, |f| match f {
            FailOn::LastCommit(e) => Some(e),
            _ => None,
        }) {
            return Err(err);
        }

        inner
            .refs
            .get(&ref_key(owner, repo, reference))
            .map(|p| p.revision.clone())
            .ok_or_else(|| RemoteError::NotFound(ref_key(owner, repo, reference)))
    }

    async fn get_repo_archive(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> Result<ArchiveStream, RemoteError> {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(MockOperation::Archive {
            owner: owner.to_string(),
            repo: repo.to_string(),
            reference: reference.to_string(),
        });

        if let Some(err) = Self::injected(&inner, owner, repo, |f| match f {
            FailOn::Archive(e) => Some(e),
            _ => None,
        }) {
            return Err(err);
        }

        let published = inner
            .refs
            .get(&ref_key(owner, repo, reference))
            .ok_or_else(|| RemoteError::Status {
                status: 404,
                message: "Not Found".into(),
            })?;
        Ok(Box::new(MemoryBody::new(
            published.archive.clone(),
            CHUNK_SIZE,
        )))
    }
}
