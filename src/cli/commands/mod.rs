//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads configuration from the [`Context`]
//! 2. Builds the library components it needs
//! 3. Formats and displays output
//!
//! # Async Commands
//!
//! Commands touching the store or the network (`sync`, `repos`, `modules`)
//! are async. Each handler is a synchronous wrapper that builds a tokio
//! runtime and blocks on its async implementation.

mod generate;
mod modules;
mod repos;
mod sync;
mod validate;

pub use generate::generate;
pub use modules::modules;
pub use repos::repos;
pub use sync::sync;
pub use validate::validate;

use anyhow::{Context as _, Result};

use super::args::Command;
use super::Context;
use crate::core::config::Config;
use crate::store::FileStore;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Sync { deployment, job } => sync::sync(ctx, &deployment, job.as_deref()),
        Command::Repos => repos::repos(ctx),
        Command::Modules { source } => modules::modules(ctx, source.as_deref()),
        Command::Validate { dir } => validate::validate(ctx, &dir),
        Command::Generate {
            dir,
            schema,
            output,
        } => generate::generate(ctx, &dir, &schema, output.as_deref()),
    }
}

/// Load configuration honoring `--config`.
pub(crate) fn load_config(ctx: &Context) -> Result<Config> {
    let config = Config::load(ctx.config_path.as_deref()).context("failed to load config")?;
    if let Some(path) = config.loaded_from() {
        tracing::debug!(path = %path.display(), "loaded config");
    }
    Ok(config)
}

/// File store at the configured location.
pub(crate) fn open_store(config: &Config) -> Result<FileStore> {
    let path = config.store_path()?;
    Ok(FileStore::with_path(path))
}
