//! sync::orchestrator
//!
//! Fans a synchronization run out over every repository channel.
//!
//! # Flow
//!
//! 1. Admit the (deployment, job) pair in the [`JobCache`]. A pair that was
//!    already admitted makes the run a no-op.
//! 2. List repositories from the store. Each (repository, channel) becomes
//!    an independent task, bounded by a semaphore.
//! 3. Per unit: resolve the remote head; if it matches the stored channel
//!    revision, stop. Otherwise spool the archive into a private scratch
//!    directory, extract it on the blocking pool, decode and validate the
//!    manifest, upsert the module and record the new channel head.
//! 4. Collect outcomes and failures in input order.
//!
//! A failing unit never affects its siblings. Only an unreachable store or
//! cancellation aborts the run; units committed before that stay committed.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::errors::{BoxError, MultiError, RepoError, RepoModuleError, SyncError};
use super::jobs::JobCache;
use crate::archive::{extract_tar_gz_until, ExtractError};
use crate::core::module::{Module, ModuleDefinition};
use crate::core::types::{ModuleId, RevisionMarker};
use crate::manifest::ManifestRegistry;
use crate::remote::{parse_source, RepositoryHost};
use crate::store::ModuleStore;
use crate::validation::ConfigValidator;

/// Default bound on concurrently running units.
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

const ARCHIVE_FILE: &str = "archive.tar.gz";
const TREE_DIR: &str = "tree";

/// Identifies one synchronization request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncJob {
    pub deployment_id: String,
    pub job_id: String,
}

impl SyncJob {
    pub fn new(deployment_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            job_id: job_id.into(),
        }
    }
}

/// Tuning for a run.
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub max_concurrency: usize,
    /// Parent of per-unit scratch directories. System temp dir if unset.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            scratch_dir: None,
        }
    }
}

/// Outcome of one successful unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    /// A new revision was decoded, validated and stored.
    Updated {
        source: String,
        channel: String,
        module_id: ModuleId,
        version: String,
        sha: String,
    },
    /// The remote head matches the stored revision.
    Unchanged {
        source: String,
        channel: String,
        sha: String,
    },
}

/// Result of a run that was not aborted.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub updated: Vec<UnitOutcome>,
    pub unchanged: Vec<UnitOutcome>,
    /// The job had already been admitted; nothing ran.
    pub duplicate: bool,
    /// Per-unit failures in input order. `None` when every unit succeeded.
    pub errors: Option<MultiError>,
}

impl SyncReport {
    fn duplicate() -> Self {
        Self {
            duplicate: true,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_none()
    }

    /// Split off the batch error, if any.
    pub fn into_result(mut self) -> Result<SyncReport, MultiError> {
        match self.errors.take() {
            Some(errors) => Err(errors),
            None => Ok(self),
        }
    }
}

/// Runs synchronization jobs.
#[derive(Clone)]
pub struct Orchestrator {
    host: Arc<dyn RepositoryHost>,
    store: Arc<dyn ModuleStore>,
    jobs: Arc<JobCache>,
    manifests: Arc<ManifestRegistry>,
    validator: Arc<ConfigValidator>,
    options: OrchestratorOptions,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("host", &self.host.name())
            .field("options", &self.options)
            .finish()
    }
}

/// One (repository, channel) unit of work.
#[derive(Debug, Clone)]
struct Unit {
    source: String,
    owner: String,
    repo: String,
    channel: String,
}

/// Position in the result list: a unit that could not start, or a task.
enum Slot {
    Failed(BoxError),
    Running(Unit, JoinHandle<Result<UnitOutcome, SyncError>>),
}

impl Orchestrator {
    /// Orchestrator with the built-in manifest schemas and config types.
    pub fn new(
        host: Arc<dyn RepositoryHost>,
        store: Arc<dyn ModuleStore>,
        jobs: Arc<JobCache>,
    ) -> Self {
        Self {
            host,
            store,
            jobs,
            manifests: Arc::new(ManifestRegistry::default()),
            validator: Arc::new(ConfigValidator::default()),
            options: OrchestratorOptions::default(),
        }
    }

    pub fn with_options(mut self, options: OrchestratorOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_manifests(mut self, manifests: ManifestRegistry) -> Self {
        self.manifests = Arc::new(manifests);
        self
    }

    pub fn with_validator(mut self, validator: ConfigValidator) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn jobs(&self) -> &Arc<JobCache> {
        &self.jobs
    }

    /// Run `job` against every repository in the store.
    ///
    /// # Errors
    ///
    /// Only fatal failures: the store is unavailable, or `cancel` fired.
    /// Everything else is reported in [`SyncReport::errors`].
    pub async fn run(
        &self,
        job: &SyncJob,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let span = info_span!(
            "sync",
            deployment_id = %job.deployment_id,
            job_id = %job.job_id
        );
        self.run_inner(job, cancel).instrument(span).await
    }

    async fn run_inner(
        &self,
        job: &SyncJob,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        if cancel.is_cancelled() {
            return Err(SyncError::Canceled);
        }
        if !self.jobs.admit(&job.deployment_id, &job.job_id) {
            info!("job already admitted, skipping");
            return Ok(SyncReport::duplicate());
        }

        let repositories = until_canceled(cancel, self.store.list_repositories()).await??;
        info!(repositories = repositories.len(), "starting sync");

        // Cancelled on fatal unit errors so siblings stop early.
        let run_cancel = cancel.child_token();
        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrency.max(1)));
        let mut slots = Vec::new();

        for repository in &repositories {
            let source = repository.source().to_string();
            let Some((owner, repo)) = parse_source(&source) else {
                warn!(source = %source, "unsupported repository source");
                slots.push(Slot::Failed(Box::new(RepoError::new(
                    source.clone(),
                    SyncError::InvalidSource(source),
                ))));
                continue;
            };

            for channel in repository.channels() {
                let unit = Unit {
                    source: source.clone(),
                    owner: owner.clone(),
                    repo: repo.clone(),
                    channel: channel.name.clone(),
                };
                let handle = self.spawn_unit(unit.clone(), &semaphore, &run_cancel);
                slots.push(Slot::Running(unit, handle));
            }
        }

        let mut report = SyncReport::default();
        let mut errors: Vec<BoxError> = Vec::new();
        let mut slots = slots.into_iter();

        while let Some(slot) = slots.next() {
            let (unit, handle) = match slot {
                Slot::Failed(err) => {
                    errors.push(err);
                    continue;
                }
                Slot::Running(unit, handle) => (unit, handle),
            };

            let result = match handle.await {
                Ok(result) => result,
                Err(join) => Err(SyncError::Io(std::io::Error::other(format!(
                    "worker task failed: {}",
                    join
                )))),
            };

            match result {
                Ok(outcome @ UnitOutcome::Updated { .. }) => report.updated.push(outcome),
                Ok(outcome @ UnitOutcome::Unchanged { .. }) => report.unchanged.push(outcome),
                Err(err) if err.is_fatal() => {
                    warn!(source = %unit.source, channel = %unit.channel, error = %err, "aborting sync");
                    run_cancel.cancel();
                    // Siblings observe the token and return promptly; waiting
                    // lets them release their scratch directories.
                    for rest in slots {
                        if let Slot::Running(_, handle) = rest {
                            let _ = handle.await;
                        }
                    }
                    return Err(err);
                }
                Err(err) => {
                    warn!(
                        source = %unit.source,
                        channel = %unit.channel,
                        kind = %err.kind(),
                        error = %err,
                        "unit failed"
                    );
                    errors.push(Box::new(RepoModuleError::new(
                        unit.source,
                        unit.channel,
                        err,
                    )));
                }
            }
        }

        report.errors = MultiError::from_errors(errors);
        info!(
            updated = report.updated.len(),
            unchanged = report.unchanged.len(),
            failed = report.errors.as_ref().map_or(0, MultiError::len),
            "sync finished"
        );
        Ok(report)
    }

    fn spawn_unit(
        &self,
        unit: Unit,
        semaphore: &Arc<Semaphore>,
        cancel: &CancellationToken,
    ) -> JoinHandle<Result<UnitOutcome, SyncError>> {
        let this = self.clone();
        let semaphore = Arc::clone(semaphore);
        let cancel = cancel.clone();
        let span = info_span!("unit", source = %unit.source, channel = %unit.channel);

        tokio::spawn(
            async move {
                let _permit = until_canceled(&cancel, semaphore.acquire_owned())
                    .await?
                    .map_err(|_| SyncError::Canceled)?;
                this.sync_unit(&unit, &cancel).await
            }
            .instrument(span),
        )
    }

    async fn sync_unit(
        &self,
        unit: &Unit,
        cancel: &CancellationToken,
    ) -> Result<UnitOutcome, SyncError> {
        let remote = until_canceled(
            cancel,
            self.host
                .get_last_commit(&unit.owner, &unit.repo, &unit.channel),
        )
        .await??;

        let head = until_canceled(cancel, self.store.channel_head(&unit.source, &unit.channel))
            .await??;
        if head
            .revision
            .as_ref()
            .is_some_and(|stored| stored.same_revision(&remote))
        {
            debug!(sha = %remote.sha, "revision unchanged");
            return Ok(UnitOutcome::Unchanged {
                source: unit.source.clone(),
                channel: unit.channel.clone(),
                sha: remote.sha,
            });
        }

        let scratch = self.scratch_dir()?;
        let archive_path = scratch.path().join(ARCHIVE_FILE);
        self.download(unit, &archive_path, cancel).await?;

        let definition = self.unpack_and_decode(scratch.path(), cancel).await?;
        self.validator.validate_module(&definition)?;

        let module = self.commit(unit, definition, remote, cancel).await?;
        info!(
            module_id = %module.id.short(),
            version = %module.version(),
            sha = %module.revision.sha,
            "module updated"
        );

        Ok(UnitOutcome::Updated {
            source: unit.source.clone(),
            channel: unit.channel.clone(),
            version: module.version().to_string(),
            sha: module.revision.sha.clone(),
            module_id: module.id,
        })
    }

    fn scratch_dir(&self) -> Result<tempfile::TempDir, SyncError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("modsync-");
        let dir = match &self.options.scratch_dir {
            Some(parent) => {
                std::fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };
        Ok(dir)
    }

    /// Stream the archive into `path`, racing every chunk against `cancel`.
    async fn download(
        &self,
        unit: &Unit,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<(), SyncError> {
        let mut stream = until_canceled(
            cancel,
            self.host
                .get_repo_archive(&unit.owner, &unit.repo, &unit.channel),
        )
        .await??;

        let mut file = tokio::fs::File::create(path).await?;
        let mut bytes = 0usize;
        while let Some(chunk) = until_canceled(cancel, stream.chunk()).await?? {
            bytes += chunk.len();
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        debug!(bytes, "archive downloaded");
        Ok(())
    }

    /// Extract and decode on the blocking pool.
    ///
    /// The blocking task cannot be aborted, so cancellation is polled per
    /// archive entry and the task is always awaited. The scratch directory is
    /// only dropped once nothing writes into it anymore.
    async fn unpack_and_decode(
        &self,
        scratch: &Path,
        cancel: &CancellationToken,
    ) -> Result<ModuleDefinition, SyncError> {
        let archive_path = scratch.join(ARCHIVE_FILE);
        let tree = scratch.join(TREE_DIR);
        let manifests = Arc::clone(&self.manifests);
        let stop = cancel.clone();

        let task = tokio::task::spawn_blocking(move || -> Result<ModuleDefinition, SyncError> {
            std::fs::create_dir_all(&tree)?;
            let archive = std::fs::File::open(&archive_path)?;
            let root = extract_tar_gz_until(std::io::BufReader::new(archive), &tree, || {
                stop.is_cancelled()
            })?;
            Ok(manifests.decode_dir(&tree.join(root))?)
        });

        let result = task.await.map_err(|join| {
            SyncError::Io(std::io::Error::other(format!("extraction failed: {}", join)))
        })?;
        if cancel.is_cancelled() {
            return Err(SyncError::Canceled);
        }
        match result {
            Err(SyncError::Extract(ExtractError::Interrupted)) => Err(SyncError::Canceled),
            other => other,
        }
    }

    async fn commit(
        &self,
        unit: &Unit,
        definition: ModuleDefinition,
        revision: RevisionMarker,
        cancel: &CancellationToken,
    ) -> Result<Module, SyncError> {
        let module = Module::new(
            definition,
            unit.source.clone(),
            unit.channel.clone(),
            revision.clone(),
            Utc::now(),
        );
        let previous = until_canceled(cancel, self.store.get_module(&module.id)).await??;
        let module = module.merge_previous(previous.as_ref());

        until_canceled(cancel, self.store.upsert_module(module.clone())).await??;
        until_canceled(
            cancel,
            self.store
                .set_channel_head(&unit.source, &unit.channel, module.version(), revision),
        )
        .await??;
        Ok(module)
    }
}

/// Race `fut` against cancellation.
async fn until_canceled<F: Future>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, SyncError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(SyncError::Canceled),
        out = fut => Ok(out),
    }
}
