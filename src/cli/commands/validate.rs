//! cli::commands::validate
//!
//! Decode and validate the manifest of a local module tree, the same checks
//! a sync applies to a downloaded revision.

use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::manifest::ManifestRegistry;
use crate::validation::ConfigValidator;

/// Run the validate command.
pub fn validate(ctx: &Context, dir: &Path) -> Result<()> {
    let registry = ManifestRegistry::default();
    let definition = registry
        .decode_dir(dir)
        .with_context(|| format!("failed to decode manifest in '{}'", dir.display()))?;

    ConfigValidator::default()
        .validate_module(&definition)
        .with_context(|| format!("module '{}' is invalid", definition.id))?;

    if !ctx.quiet {
        println!(
            "{} {} is valid ({} config option(s)).",
            definition.id,
            definition.version,
            definition.configs.len()
        );
    }
    Ok(())
}
