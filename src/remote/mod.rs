//! remote
//!
//! Access to remote repository hosts.
//!
//! # Modules
//!
//! - `traits`: the [`RepositoryHost`] trait, [`RemoteError`] and archive streams
//! - [`github`]: GitHub REST implementation
//! - [`mock`]: in-memory host for deterministic tests
//!
//! Callers hold hosts as `Arc<dyn RepositoryHost>` and never name a concrete
//! implementation outside construction.

pub mod github;
pub mod mock;
mod traits;

pub use github::{parse_source, GitHubHost};
pub use traits::*;
