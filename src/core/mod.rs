//! core
//!
//! Core domain types and configuration for modsync.
//!
//! # Modules
//!
//! - [`types`] - Strong types: Repository, Channel, RevisionMarker, ModuleId
//! - [`module`] - Canonical module definition and stored module record
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at construction time
//! - Schemas are strict and self-describing
//! - Identity derivation is deterministic

pub mod config;
pub mod module;
pub mod types;
