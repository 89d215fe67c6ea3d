//! cli::commands::repos
//!
//! List repositories and their channel heads from the store.

use anyhow::Result;

use super::{load_config, open_store};
use crate::cli::Context;
use crate::store::ModuleStore;

/// Run the repos command.
pub fn repos(ctx: &Context) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(repos_async(ctx))
}

async fn repos_async(ctx: &Context) -> Result<()> {
    let config = load_config(ctx)?;
    let store = open_store(&config)?;
    let repositories = store.list_repositories().await?;

    if repositories.is_empty() {
        if !ctx.quiet {
            println!("No repositories. Run 'modsync sync' after configuring some.");
        }
        return Ok(());
    }

    for repo in &repositories {
        let marker = if repo.is_default() { " (default)" } else { "" };
        println!("{}{}", repo.source(), marker);
        for channel in repo.channels() {
            let head = match (&channel.version, &channel.revision) {
                (Some(version), Some(rev)) => format!(
                    "{} at {} ({})",
                    version,
                    rev.sha.get(..7).unwrap_or(&rev.sha),
                    rev.timestamp.format("%Y-%m-%d %H:%M")
                ),
                _ => "never synced".to_string(),
            };
            let flag = if channel.default { "*" } else { " " };
            println!("  {} {:<12} {}", flag, channel.name, head);
        }
    }
    Ok(())
}
