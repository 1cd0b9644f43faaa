//! The batch update protocol.

use crate::commit::{Commit, cancellable, commit};
use crate::error::{Error, ErrorKind, Result};
use crate::merge::{Incoming, merge};
use crate::store::Store;
use crate::{Batch, LeaseRegistry, UpdateReport, prior, scan};
use chrono::Utc;
use exn::{OptionExt, ResultExt};
use futures::{StreamExt, TryStreamExt};
use rpmrepo_config::{ConflictPolicy, RepoConfig, UpdateMode};
use rpmrepo_metadata::{MetadataDescriptor, MetadataKind, NamingPolicy, WriterContext, generate};
use rpmrepo_rpm::models::{Nevra, Package};
use rpmrepo_rpm::{ParseOptions, is_rpm, parse_with};
use rpmrepo_storage::BackendHandle;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Added RPMs read from storage at once.
const PARALLEL_READS: usize = 8;

/// Observable state of a repository's coordinator.
///
/// `Failed` is reported from a failed batch until the next one starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateState {
    #[default]
    Idle,
    Updating,
    Failed,
}

enum Plan {
    Batch(Batch),
    Rescan(Option<PathBuf>),
}

/// Owns the metadata of one repository.
///
/// A batch reads the published state, folds in the batch, regenerates all
/// metadata and publishes it by writing `repomd.xml` last. Batches for the
/// same repository are serialized through the [`LeaseRegistry`]; how a
/// second batch behaves while one is running is the repository's
/// [`ConflictPolicy`].
pub struct UpdateCoordinator {
    repo: String,
    store: Store,
    config: RepoConfig,
    leases: LeaseRegistry,
    state: watch::Sender<UpdateState>,
}

/// Marks the coordinator failed if a batch ends without reporting, which
/// is what happens when its future is dropped.
struct Transition<'a> {
    state: &'a watch::Sender<UpdateState>,
    finished: bool,
}

impl Drop for Transition<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.state.send_replace(UpdateState::Failed);
        }
    }
}

impl UpdateCoordinator {
    pub fn new(repo: impl Into<String>, backend: BackendHandle, config: RepoConfig, leases: LeaseRegistry) -> Self {
        Self {
            repo: repo.into(),
            store: Store::new(backend, config.storage_timeout),
            config,
            leases,
            state: watch::Sender::new(UpdateState::Idle),
        }
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn state(&self) -> UpdateState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<UpdateState> {
        self.state.subscribe()
    }

    /// Add and remove packages in one atomic step.
    pub async fn batch_update(&self, batch: Batch) -> Result<UpdateReport> {
        self.batch_update_cancellable(batch, &CancellationToken::new()).await
    }

    /// [`batch_update`](Self::batch_update) that gives up with
    /// [`Cancelled`](ErrorKind::Cancelled) if `token` fires before
    /// `repomd.xml` is written. After that the batch completes regardless.
    pub async fn batch_update_cancellable(&self, batch: Batch, token: &CancellationToken) -> Result<UpdateReport> {
        self.run(Plan::Batch(batch), token).await
    }

    /// Bring the metadata in line with the RPMs actually stored under
    /// `prefix` (the whole repository when `None`).
    pub async fn rescan(&self, prefix: Option<&Path>) -> Result<UpdateReport> {
        self.rescan_cancellable(prefix, &CancellationToken::new()).await
    }

    pub async fn rescan_cancellable(&self, prefix: Option<&Path>, token: &CancellationToken) -> Result<UpdateReport> {
        self.run(Plan::Rescan(prefix.map(Path::to_path_buf)), token).await
    }

    /// Store an uploaded RPM. In `upload` mode it is published right away
    /// and the report is returned; in `cron` mode the next scheduled rescan
    /// picks it up.
    #[instrument(skip_all, fields(repo = %self.repo, key = %key.display(), size = bytes.len()))]
    pub async fn upload(&self, key: &Path, bytes: &[u8]) -> Result<Option<UpdateReport>> {
        if !is_rpm(bytes) {
            exn::bail!(ErrorKind::MalformedPackage(key.display().to_string()));
        }
        self.store.write(key, bytes).await?;
        match self.config.mode {
            UpdateMode::Upload => self.batch_update(Batch::new().add(key)).await.map(Some),
            UpdateMode::Cron(_) => {
                tracing::debug!("stored; waiting for the next scheduled update");
                Ok(None)
            },
        }
    }

    #[instrument(skip_all, fields(repo = %self.repo))]
    async fn run(&self, plan: Plan, token: &CancellationToken) -> Result<UpdateReport> {
        let _lease = match self.config.on_conflict {
            ConflictPolicy::Wait => cancellable(token, async { Ok(self.leases.acquire(&self.repo).await) }).await?,
            ConflictPolicy::Fail => self
                .leases
                .try_acquire(&self.repo)
                .ok_or_raise(|| ErrorKind::UpdateInProgress(self.repo.clone()))?,
        };
        self.state.send_replace(UpdateState::Updating);
        let mut transition = Transition {
            state: &self.state,
            finished: false,
        };
        let result = self.update(plan, token).await;
        transition.finished = true;
        match &result {
            Ok(report) => {
                tracing::info!(
                    revision = report.revision,
                    packages = report.packages,
                    added = report.added,
                    replaced = report.replaced,
                    removed = report.removed,
                    "batch published"
                );
                self.state.send_replace(UpdateState::Idle);
            },
            Err(err) => {
                tracing::warn!(error = ?err, "batch failed");
                self.state.send_replace(UpdateState::Failed);
            },
        }
        result
    }

    async fn update(&self, plan: Plan, token: &CancellationToken) -> Result<UpdateReport> {
        let now = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
        let prior = cancellable(token, prior::load(&self.store)).await?;
        let batch = match plan {
            Plan::Batch(batch) => batch,
            Plan::Rescan(prefix) => {
                cancellable(token, scan::plan(&self.store, &prior.packages, prefix.as_deref())).await?
            },
        };
        tracing::debug!(add = batch.add.len(), remove = batch.remove.len(), "applying batch");

        let incoming = cancellable(token, self.parse_all(&batch.add, now)).await?;
        let merged = merge(prior.packages, &batch.remove, incoming);
        let revision = prior.revision.map_or(now, |previous| now.max(previous + 1));
        let locations: HashSet<String> = merged.packages.values().map(|p| p.location.clone()).collect();
        let packages = merged.packages.len();
        let descriptors = cancellable(token, self.generate(merged.packages, now)).await?;

        let records = commit(
            &self.store,
            token,
            Commit {
                relocations: &merged.relocations,
                descriptors: &descriptors,
                revision,
                prior: &prior.records,
                locations,
                discard: merged.discard,
            },
        )
        .await?;
        Ok(UpdateReport {
            revision,
            packages,
            added: merged.added,
            replaced: merged.replaced,
            unchanged: merged.unchanged,
            removed: merged.removed,
            records,
        })
    }

    /// Read and parse the added RPMs, keeping batch order.
    async fn parse_all(&self, keys: &[PathBuf], file_time: u64) -> Result<Vec<Incoming>> {
        let store = &self.store;
        let digest = self.config.digest;
        let naming = self.config.content_addressed_packages.then_some(self.config.naming);
        futures::stream::iter(keys.iter().cloned())
            .map(move |key| async move {
                let name = key.display().to_string();
                let bytes = store.read_if_exists(&key).await?.ok_or_raise(|| ErrorKind::PackageNotFound(name.clone()))?;
                let options = ParseOptions {
                    location: location_for(&key, &bytes, naming),
                    digest,
                    file_time,
                };
                let (package, bytes) = tokio::task::spawn_blocking(move || (parse_with(&bytes, &options), bytes))
                    .await
                    .or_raise(|| ErrorKind::Generation)?;
                let package = package.or_raise(|| ErrorKind::MalformedPackage(name))?;
                Ok::<_, Error>(Incoming { key, package, bytes })
            })
            .buffered(PARALLEL_READS)
            .try_collect()
            .await
    }

    /// Write every enabled metadata file over the full package set.
    async fn generate(&self, packages: BTreeMap<Nevra, Package>, timestamp: u64) -> Result<Vec<MetadataDescriptor>> {
        let context = WriterContext {
            digest: self.config.digest,
            naming: self.config.naming,
            compression: self.config.compression,
            timestamp,
            changelog_limit: self.config.changelog_limit,
        };
        let filelists = self.config.filelists;
        tokio::task::spawn_blocking(move || {
            MetadataKind::ALL
                .into_iter()
                .filter(|&kind| filelists || kind != MetadataKind::Filelists)
                .map(|kind| generate(kind, packages.values(), &context))
                .collect::<rpmrepo_metadata::error::Result<Vec<_>>>()
        })
        .await
        .or_raise(|| ErrorKind::Generation)?
        .or_raise(|| ErrorKind::Generation)
    }
}

/// Where a package is published: its upload key, or with content
/// addressing, a content-derived name next to it.
fn location_for(key: &Path, bytes: &[u8], naming: Option<NamingPolicy>) -> String {
    let (Some(naming), Some(file_name)) = (naming, key.file_name()) else {
        return key.to_string_lossy().into_owned();
    };
    let stored = naming.name_for(&file_name.to_string_lossy(), bytes);
    match key.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.join(stored).to_string_lossy().into_owned(),
        _ => stored,
    }
}
