//! cli::commands::modules
//!
//! List stored modules.

use anyhow::Result;

use super::{load_config, open_store};
use crate::cli::Context;
use crate::store::ModuleStore;

/// Run the modules command.
pub fn modules(ctx: &Context, source: Option<&str>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(modules_async(ctx, source))
}

async fn modules_async(ctx: &Context, source: Option<&str>) -> Result<()> {
    let config = load_config(ctx)?;
    let store = open_store(&config)?;
    let modules: Vec<_> = store
        .list_modules()
        .await?
        .into_iter()
        .filter(|m| source.map_or(true, |s| m.source == s))
        .collect();

    if modules.is_empty() {
        if !ctx.quiet {
            println!("No modules.");
        }
        return Ok(());
    }

    for module in &modules {
        println!(
            "{}  {:<24} {:<10} {}@{}",
            module.id.short(),
            module.name(),
            module.version(),
            module.source,
            module.channel
        );
        if ctx.debug {
            println!(
                "    added {}  updated {}  configs {}",
                module.added.to_rfc3339(),
                module.updated.to_rfc3339(),
                module.definition.configs.len()
            );
        }
    }
    Ok(())
}
