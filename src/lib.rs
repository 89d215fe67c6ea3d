//! modsync - Synchronize module repositories into a local module store
//!
//! modsync keeps a store of module definitions current with the channels of
//! remote repositories. For each configured repository channel it fetches the
//! remote head, downloads and unpacks a snapshot when the head moved, decodes
//! the `Modfile` manifest, validates its config options and commits the
//! resulting module.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer
//! - [`core`] - Domain types, module model and configuration
//! - [`sync`] - Orchestrator, job deduplication and error aggregation
//! - [`remote`] - Repository host abstraction (GitHub and an in-memory mock)
//! - [`archive`] - Safe gzip/tar extraction
//! - [`manifest`] - Versioned manifest decoders and generators
//! - [`validation`] - Config option validation
//! - [`store`] - Persistent and in-memory module stores
//!
//! # Invariants
//!
//! 1. A job is executed at most once per deployment while it is remembered
//! 2. One failing repository channel never prevents the others from syncing
//! 3. A module is committed only after its manifest decoded and validated
//! 4. Extraction never writes outside its destination directory

pub mod archive;
pub mod cli;
pub mod core;
pub mod manifest;
pub mod remote;
pub mod store;
pub mod sync;
pub mod validation;
