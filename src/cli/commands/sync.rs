//! cli::commands::sync
//!
//! Synchronize every configured repository channel into the file store.
//!
//! # Design
//!
//! Repositories declared in the config are upserted into the store first so
//! the store remains the single source the orchestrator reads. Ctrl-C
//! cancels the run.
//!
//! The job cache lives in memory, so a one-shot invocation admits its job
//! exactly once and never sees a duplicate. Re-running is still cheap:
//! channels whose head matches the stored revision are not downloaded.
//!
//! # Example
//!
//! ```bash
//! # Sync with a generated job id
//! modsync sync
//!
//! # Tag the run for the logs
//! modsync sync --deployment edge-42 --job 7f1c
//! ```

use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{load_config, open_store};
use crate::cli::Context;
use crate::remote::GitHubHost;
use crate::store::ModuleStore;
use crate::sync::{JobCache, Orchestrator, SyncJob, SyncReport, UnitOutcome};

/// Run the sync command.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn sync(ctx: &Context, deployment: &str, job: Option<&str>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(sync_async(ctx, deployment, job))
}

async fn sync_async(ctx: &Context, deployment: &str, job: Option<&str>) -> Result<()> {
    let config = load_config(ctx)?;
    let store = Arc::new(open_store(&config)?);

    let repositories = config.repositories()?;
    if repositories.is_empty() {
        warn!("no repositories configured");
    }
    for repo in repositories {
        store
            .upsert_repository(repo)
            .await
            .context("failed to register repository")?;
    }

    let host = GitHubHost::with_options(config.api_base(), config.user_agent(), config.timeout())?;
    let orchestrator = Orchestrator::new(Arc::new(host), store, Arc::new(JobCache::new()))
        .with_options(config.orchestrator_options());

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, canceling");
            signal_token.cancel();
        }
    });

    let job_id = job
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let job = SyncJob::new(deployment, job_id);

    let report = orchestrator.run(&job, &cancel).await?;
    print_report(ctx, &job, &report);

    match report.errors {
        Some(errors) => bail!("{} unit(s) failed:\n{}", errors.len(), errors),
        None => Ok(()),
    }
}

fn print_report(ctx: &Context, job: &SyncJob, report: &SyncReport) {
    if ctx.quiet {
        return;
    }
    for outcome in &report.updated {
        if let UnitOutcome::Updated {
            source,
            channel,
            module_id,
            version,
            sha,
        } = outcome
        {
            println!(
                "updated  {}@{} -> {} {} ({})",
                source,
                channel,
                module_id.short(),
                version,
                short_sha(sha)
            );
        }
    }
    for outcome in &report.unchanged {
        if let UnitOutcome::Unchanged {
            source,
            channel,
            sha,
        } = outcome
        {
            println!("current  {}@{} ({})", source, channel, short_sha(sha));
        }
    }
    println!(
        "Synced: {} updated, {} unchanged.",
        report.updated.len(),
        report.unchanged.len()
    );
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_sha_truncates() {
        assert_eq!(short_sha("0123456789abcdef"), "0123456");
        assert_eq!(short_sha("abc"), "abc");
    }
}
