//! store
//!
//! Persistent store interface and reference implementations.
//!
//! # Modules
//!
//! - `traits`: the async [`ModuleStore`] trait and [`StoreError`]
//! - `document`: the record set both reference stores operate on
//! - [`memory`]: [`MemoryStore`], for tests and embedding
//! - [`file_store`]: [`FileStore`], a JSON document on disk used by the CLI

mod document;
pub mod file_store;
pub mod memory;
mod traits;

pub use document::{StoreDocument, DOCUMENT_VERSION};
pub use file_store::FileStore;
pub use memory::MemoryStore;
pub use traits::{ModuleStore, StoreError};
