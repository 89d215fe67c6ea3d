//! remote::traits
//!
//! Repository host trait for revision lookups and archive downloads.
//!
//! # Design
//!
//! The `RepositoryHost` trait is async because both operations involve
//! network I/O. Archives are handed back as an [`ArchiveStream`] so large
//! downloads are never buffered whole in memory; the caller pulls chunks and
//! drops the stream when done, which releases the connection.
//!
//! No operation retries. A failed call is reported once and the caller
//! decides what to do with it.
//!
//! # Example
//!
//! ```ignore
//! use modsync::remote::RepositoryHost;
//!
//! async fn head(host: &dyn RepositoryHost) -> Result<(), RemoteError> {
//!     let rev = host.get_last_commit("acme", "sensor", "stable").await?;
//!     println!("stable is at {} ({})", rev.sha, rev.timestamp);
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::types::RevisionMarker;
use crate::sync::ErrorKind;

/// Errors from repository host operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// The host answered with a status of 400 or above.
    #[error("remote returned {status}: {message}")]
    Status {
        status: u16,
        /// Response body, or the canonical status text if the body was empty.
        message: String,
    },

    /// The request never produced a response (DNS, connect, TLS, timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The repository or reference does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The response could not be understood.
    #[error("malformed response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RemoteError::Status { .. } => ErrorKind::Remote,
            RemoteError::Transport(_) => ErrorKind::Transport,
            RemoteError::NotFound(_) => ErrorKind::NotFound,
            RemoteError::Decode(_) => ErrorKind::Decode,
        }
    }
}

/// A chunked archive body.
#[async_trait]
pub trait ArchiveBody: Send {
    /// Next chunk, or `None` once the body is exhausted.
    async fn chunk(&mut self) -> Result<Option<Vec<u8>>, RemoteError>;
}

/// Owned archive body returned by [`RepositoryHost::get_repo_archive`].
pub type ArchiveStream = Box<dyn ArchiveBody>;

/// A remote host serving repositories.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so one host can serve every worker
/// task of a synchronization run.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Revision marker of the latest commit on `reference`.
    ///
    /// The marker's timestamp is the later of the author and committer times.
    async fn get_last_commit(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> Result<RevisionMarker, RemoteError>;

    /// Source archive (`.tar.gz`) of `reference`.
    async fn get_repo_archive(
        &self,
        owner: &str,
        repo: &str,
        reference: &str,
    ) -> Result<ArchiveStream, RemoteError>;
}

/// In-memory body yielding fixed-size chunks.
#[derive(Debug)]
pub struct MemoryBody {
    data: Vec<u8>,
    offset: usize,
    chunk_size: usize,
}

impl MemoryBody {
    pub fn new(data: Vec<u8>, chunk_size: usize) -> Self {
        Self {
            data,
            offset: 0,
            chunk_size: chunk_size.max(1),
        }
    }
}

#[async_trait]
impl ArchiveBody for MemoryBody {
    async fn chunk(&mut self) -> Result<Option<Vec<u8>>, RemoteError> {
        if self.offset >= self.data.len() {
            return Ok(None);
        }
        let end = (self.offset + self.chunk_size).min(self.data.len());
        let chunk = self.data[self.offset..end].to_vec();
        self.offset = end;
        Ok(Some(chunk))
    }
}

/// Drain a stream into memory. Intended for small archives and tests.
pub async fn read_to_end(stream: &mut ArchiveStream) -> Result<Vec<u8>, RemoteError> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.chunk().await? {
        out.extend_from_slice(&chunk);
    }
    Ok(out)
}
