//! cli
//!
//! Command-line interface layer for modsync.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Load configuration once and hand it to command handlers
//! - Delegate to command handlers
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to
//! handlers that wire the library pieces ([`crate::sync::Orchestrator`],
//! [`crate::store::FileStore`], [`crate::remote::GitHubHost`]) together.

pub mod args;
pub mod commands;

pub use args::{Cli, Command};

use std::path::PathBuf;

use anyhow::Result;

/// Per-invocation settings shared by every command.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Explicit config file from `--config`.
    pub config_path: Option<PathBuf>,
    pub debug: bool,
    pub quiet: bool,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            config_path: cli.config.clone(),
            debug: cli.debug,
            quiet: cli.quiet,
        }
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`. Logging must already
/// be initialized.
pub fn run(cli: Cli) -> Result<()> {
    let ctx = Context::from_cli(&cli);
    commands::dispatch(cli.command, &ctx)
}
