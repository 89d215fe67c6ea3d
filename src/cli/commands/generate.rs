//! cli::commands::generate
//!
//! Re-emit a local module's manifest in a chosen schema version.

use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::manifest::ManifestRegistry;

/// Run the generate command.
pub fn generate(ctx: &Context, dir: &Path, schema: &str, output: Option<&Path>) -> Result<()> {
    let registry = ManifestRegistry::default();
    let definition = registry
        .decode_dir(dir)
        .with_context(|| format!("failed to decode manifest in '{}'", dir.display()))?;
    let rendered = registry.generate(&definition, schema)?;

    match output {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("failed to write '{}'", path.display()))?;
            if !ctx.quiet {
                println!("Wrote {} manifest to {}", schema, path.display());
            }
        }
        None => print!("{}", rendered),
    }
    Ok(())
}
