//! sync::errors
//!
//! Per-unit failures and their aggregation.
//!
//! Every stage of the pipeline reports its own error enum; [`SyncError`]
//! composes them so a unit's outcome has one type. [`RepoError`] and
//! [`RepoModuleError`] attach the repository (and channel) a failure came
//! from, and [`MultiError`] carries all of a batch's failures in input order.
//!
//! # Example
//!
//! ```
//! use modsync::sync::{MultiError, RepoError, SyncError};
//!
//! let errors: Vec<Box<dyn std::error::Error + Send + Sync>> = vec![
//!     Box::new(RepoError::new("github.com/a/one", SyncError::Canceled)),
//!     Box::new(RepoError::new("github.com/a/two", SyncError::Canceled)),
//! ];
//! let batch = MultiError::from_errors(errors).unwrap();
//! assert_eq!(batch.len(), 2);
//! assert_eq!(batch.to_string().lines().count(), 2);
//!
//! assert!(MultiError::from_errors(Vec::new()).is_none());
//! ```

use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

use super::ErrorKind;
use crate::archive::ExtractError;
use crate::core::types::TypeError;
use crate::manifest::ManifestError;
use crate::remote::RemoteError;
use crate::store::StoreError;
use crate::validation::ValidationError;

/// Boxed error as held by [`MultiError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure of one synchronization unit.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Type(#[from] TypeError),

    /// The repository source is not an address the host understands.
    #[error("unsupported repository source '{0}'")]
    InvalidSource(String),

    #[error("synchronization canceled")]
    Canceled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Remote(e) => e.kind(),
            SyncError::Extract(e) => e.kind(),
            SyncError::Manifest(e) => e.kind(),
            SyncError::Validation(e) => e.kind(),
            SyncError::Store(e) => e.kind(),
            SyncError::Type(_) | SyncError::InvalidSource(_) => ErrorKind::Validation,
            SyncError::Canceled => ErrorKind::Canceled,
            SyncError::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether the failure aborts the whole run rather than one unit.
    pub fn is_fatal(&self) -> bool {
        match self {
            SyncError::Store(e) => e.is_unavailable(),
            SyncError::Canceled => true,
            _ => false,
        }
    }
}

/// A failure attributed to a repository as a whole.
#[derive(Debug, Error)]
#[error("repository {repo}: {cause}")]
pub struct RepoError {
    repo: String,
    #[source]
    cause: SyncError,
}

impl RepoError {
    pub fn new(repo: impl Into<String>, cause: SyncError) -> Self {
        Self {
            repo: repo.into(),
            cause,
        }
    }

    /// Source address of the failing repository.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn cause(&self) -> &SyncError {
        &self.cause
    }

    pub fn kind(&self) -> ErrorKind {
        self.cause.kind()
    }
}

/// A failure attributed to one channel of a repository.
#[derive(Debug, Error)]
#[error("repository {repo} channel {channel}: {cause}")]
pub struct RepoModuleError {
    repo: String,
    channel: String,
    #[source]
    cause: SyncError,
}

impl RepoModuleError {
    pub fn new(repo: impl Into<String>, channel: impl Into<String>, cause: SyncError) -> Self {
        Self {
            repo: repo.into(),
            channel: channel.into(),
            cause,
        }
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn cause(&self) -> &SyncError {
        &self.cause
    }

    pub fn kind(&self) -> ErrorKind {
        self.cause.kind()
    }
}

/// Ordered, non-empty collection of errors from one batch.
///
/// Display renders one constituent per line, in input order.
#[derive(Debug)]
pub struct MultiError {
    errors: Vec<BoxError>,
}

impl MultiError {
    /// `None` for an empty list: an all-success batch carries no error.
    pub fn from_errors(errors: Vec<BoxError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    pub fn errors(&self) -> &[BoxError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<BoxError> {
        self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Constituents that carry channel provenance.
    pub fn module_errors(&self) -> impl Iterator<Item = &RepoModuleError> {
        self.errors
            .iter()
            .filter_map(|e| e.downcast_ref::<RepoModuleError>())
    }

    /// Constituents attributed to a repository as a whole.
    pub fn repo_errors(&self) -> impl Iterator<Item = &RepoError> {
        self.errors.iter().filter_map(|e| e.downcast_ref::<RepoError>())
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl StdError for MultiError {}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(e: impl StdError + Send + Sync + 'static) -> BoxError {
        Box::new(e)
    }

    mod multi_error {
        use super::*;

        #[test]
        fn renders_one_line_per_error_in_order() {
            let batch = MultiError::from_errors(vec![
                boxed(RepoError::new("a", SyncError::Canceled)),
                boxed(RepoModuleError::new(
                    "b",
                    "stable",
                    RemoteError::Transport("reset".into()).into(),
                )),
                boxed(std::io::Error::new(std::io::ErrorKind::Other, "disk")),
            ])
            .unwrap();

            let rendered = batch.to_string();
            let lines: Vec<_> = rendered.lines().collect();
            assert_eq!(lines.len(), 3);
            assert!(lines[0].starts_with("repository a:"));
            assert!(lines[1].starts_with("repository b channel stable:"));
            assert_eq!(lines[2], "disk");
            assert_eq!(batch.errors().len(), 3);
        }

        #[test]
        fn empty_is_none() {
            assert!(MultiError::from_errors(vec![]).is_none());
        }

        #[test]
        fn typed_access_by_downcast() {
            let batch = MultiError::from_errors(vec![
                boxed(RepoError::new("a", SyncError::InvalidSource("a".into()))),
                boxed(RepoModuleError::new("b", "beta", SyncError::Canceled)),
            ])
            .unwrap();
            assert_eq!(batch.repo_errors().next().unwrap().repo(), "a");
            let module = batch.module_errors().next().unwrap();
            assert_eq!((module.repo(), module.channel()), ("b", "beta"));
            assert_eq!(module.kind(), ErrorKind::Canceled);
        }
    }

    mod sync_error {
        use super::*;

        #[test]
        fn source_chain_reaches_cause() {
            let err = RepoModuleError::new(
                "src",
                "stable",
                StoreError::Conflict("version".into()).into(),
            );
            let source = StdError::source(&err).unwrap();
            assert_eq!(source.to_string(), "conflict: version");
        }

        #[test]
        fn only_unavailable_store_and_cancel_are_fatal() {
            assert!(SyncError::Canceled.is_fatal());
            assert!(SyncError::from(StoreError::Unavailable("down".into())).is_fatal());
            assert!(!SyncError::from(StoreError::NotFound("x".into())).is_fatal());
            assert!(!SyncError::from(RemoteError::Transport("x".into())).is_fatal());
        }

        #[test]
        fn kinds_follow_the_stage_error() {
            assert_eq!(
                SyncError::from(ValidationError::TypeMismatch {
                    left: crate::core::module::DataType::Int64,
                    right: crate::core::module::DataType::Float64,
                })
                .kind(),
                ErrorKind::TypeMismatch
            );
            assert_eq!(
                SyncError::from(ManifestError::MissingVersion).kind(),
                ErrorKind::Decode
            );
            assert_eq!(
                SyncError::from(RemoteError::Status {
                    status: 500,
                    message: "x".into()
                })
                .kind(),
                ErrorKind::Remote
            );
        }
    }
}
