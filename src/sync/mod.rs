//! sync
//!
//! The module repository synchronization pipeline.
//!
//! # Architecture
//!
//! - [`jobs`]: per-deployment dedup cache of admitted sync jobs
//! - [`errors`]: the per-unit [`SyncError`], provenance wrappers and the
//!   ordered [`MultiError`] batch error
//! - [`orchestrator`]: fans a run out over every repository channel
//!
//! A run admits its job, then for each (repository, channel) unit checks the
//! remote head, downloads and unpacks the archive, decodes and validates the
//! manifest, and upserts the module. Unit failures are collected, never
//! propagated to sibling units.

pub mod errors;
pub mod jobs;
pub mod orchestrator;

pub use errors::{MultiError, RepoError, RepoModuleError, SyncError};
pub use jobs::{spawn_purger, JobCache, MIN_PURGE_INTERVAL};
pub use orchestrator::{Orchestrator, OrchestratorOptions, SyncJob, SyncReport, UnitOutcome};

/// Classification of failures for reporting and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A repository, ref, manifest or record does not exist.
    NotFound,
    /// Malformed input: archive, manifest, response body or regex pattern.
    Decode,
    /// A declared configuration violates its constraints.
    Validation,
    /// The remote host answered with an error status.
    Remote,
    /// The remote host could not be reached.
    Transport,
    /// Values of different kinds were compared.
    TypeMismatch,
    Store,
    Canceled,
    Io,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Decode => "decode",
            ErrorKind::Validation => "validation",
            ErrorKind::Remote => "remote",
            ErrorKind::Transport => "transport",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::Store => "store",
            ErrorKind::Canceled => "canceled",
            ErrorKind::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
