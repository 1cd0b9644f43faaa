//! Publishing a generated batch.
//!
//! Files under new names are written in place. Files the published
//! `repomd.xml` still references are staged instead (see [`staging`]).
//! Until `repomd.xml` (or the staging journal) is stored, a failed or
//! cancelled batch leaves the published repository as it was.
//!
//! [`staging`]: crate::staging

use crate::error::{ErrorKind, Result};
use crate::merge::Relocation;
use crate::prior::verify;
use crate::staging;
use crate::store::Store;
use exn::ResultExt;
use rpmrepo_metadata::{DataRecord, MetadataDescriptor, REPOMD_KEY, repomd};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

const REPODATA: &str = "repodata";

/// Run `step` unless the batch is cancelled first.
pub(crate) async fn cancellable<T>(token: &CancellationToken, step: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::select! {
        biased;
        () = token.cancelled() => exn::bail!(ErrorKind::Cancelled),
        result = step => result,
    }
}

pub(crate) struct Commit<'a> {
    pub relocations: &'a [Relocation],
    pub descriptors: &'a [MetadataDescriptor],
    pub revision: u64,
    /// What the live `repomd.xml` publishes.
    pub prior: &'a [DataRecord],
    /// Locations of every package in the new set. Never deleted.
    pub locations: HashSet<String>,
    /// Upload keys no longer needed once the batch is published.
    pub discard: Vec<PathBuf>,
}

#[instrument(skip_all, fields(revision = commit.revision, files = commit.descriptors.len()))]
pub(crate) async fn commit(store: &Store, token: &CancellationToken, commit: Commit<'_>) -> Result<Vec<DataRecord>> {
    for relocation in commit.relocations {
        cancellable(token, store.write(&relocation.to, &relocation.bytes)).await?;
        tracing::debug!(from = %relocation.from.display(), to = %relocation.to.display(), "stored package");
    }
    let live: HashMap<&str, &DataRecord> =
        commit.prior.iter().map(|record| (record.location.as_str(), record)).collect();
    let mut overwrites = Vec::new();
    for descriptor in commit.descriptors {
        let record = &descriptor.record;
        let key = match live.get(record.location.as_str()) {
            // Verified when the prior state was loaded.
            Some(current) if current.checksum == record.checksum => continue,
            Some(_) => {
                overwrites.push((PathBuf::from(&record.location), descriptor.data.clone()));
                staging::staged_key(&record.location)?
            },
            None => PathBuf::from(&record.location),
        };
        cancellable(token, store.write(&key, &descriptor.data)).await?;
        let stored = cancellable(token, store.read(&key)).await?;
        verify(record, &stored)?;
    }

    let records: Vec<DataRecord> = commit.descriptors.iter().map(|d| d.record.clone()).collect();
    let index = repomd::build(&records, commit.revision).or_raise(|| ErrorKind::Generation)?;
    if token.is_cancelled() {
        exn::bail!(ErrorKind::Cancelled);
    }
    // Detached: once started, publishing completes even if the caller goes
    // away.
    let publish = tokio::spawn({
        let store = store.clone();
        async move {
            match overwrites.is_empty() {
                true => store.write(Path::new(REPOMD_KEY), &index).await,
                false => staging::publish(&store, &overwrites, &index).await,
            }
        }
    });
    publish.await.or_raise(|| ErrorKind::StorageUnavailable)??;
    tracing::info!(revision = commit.revision, "published repomd.xml");

    cleanup(store, &commit, &records).await;
    Ok(records)
}

/// Best-effort removal of files nothing references any more.
async fn cleanup(store: &Store, commit: &Commit<'_>, records: &[DataRecord]) {
    let referenced: HashSet<&str> = records.iter().map(|r| r.location.as_str()).collect();
    let mut stale: Vec<PathBuf> = match store.list(Some(Path::new(REPODATA))).await {
        Ok(listing) => listing
            .into_iter()
            .map(|info| info.key)
            .filter(|key| key != Path::new(REPOMD_KEY) && !referenced.contains(key.to_string_lossy().as_ref()))
            .collect(),
        Err(err) => {
            tracing::warn!(error = ?err, "could not list stale metadata");
            Vec::new()
        },
    };
    stale.extend(commit.relocations.iter().map(|r| r.from.clone()));
    stale.extend(commit.discard.iter().cloned());
    for key in stale {
        if commit.locations.contains(key.to_string_lossy().as_ref()) {
            continue;
        }
        match store.delete(&key).await {
            Ok(()) => tracing::debug!(key = %key.display(), "removed unreferenced file"),
            Err(err) => tracing::warn!(key = %key.display(), error = ?err, "could not remove unreferenced file"),
        }
    }
}
