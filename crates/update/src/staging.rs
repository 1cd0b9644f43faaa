//! Publishing over files the live `repomd.xml` still references.
//!
//! With plain names a batch has to overwrite the very metadata files the
//! published index points at. Those are written to `repodata/staging/`
//! first, then the new index is stored there as a journal. Once the journal
//! is stored the batch is published: the staged files are copied over the
//! live ones and `repomd.xml` is written. A batch that finds a journal newer
//! than `repomd.xml` finishes that copy before it reads the repository.

use crate::error::{ErrorKind, Result};
use crate::prior::verify;
use crate::store::Store;
use exn::{OptionExt, ResultExt};
use rpmrepo_metadata::{REPOMD_KEY, parse_repomd};
use std::path::{Path, PathBuf};
use tracing::instrument;

const STAGING: &str = "repodata/staging";
pub(crate) const JOURNAL_KEY: &str = "repodata/staging/repomd.xml";

/// Where the file published at `location` waits until it goes live.
pub(crate) fn staged_key(location: &str) -> Result<PathBuf> {
    let name = Path::new(location)
        .file_name()
        .ok_or_raise(|| ErrorKind::InvalidMetadata(location.to_string()))?;
    Ok(Path::new(STAGING).join(name))
}

/// Store the journal, then make `files` live and write `repomd.xml`.
///
/// Every file must already be staged and verified.
pub(crate) async fn publish(store: &Store, files: &[(PathBuf, Vec<u8>)], index: &[u8]) -> Result<()> {
    store.write(Path::new(JOURNAL_KEY), index).await?;
    for (location, data) in files {
        store.write(location, data).await?;
    }
    store.write(Path::new(REPOMD_KEY), index).await?;
    forget(store).await;
    Ok(())
}

/// Finish a publish that stored its journal but never got to `repomd.xml`.
#[instrument(skip_all)]
pub(crate) async fn recover(store: &Store) -> Result<()> {
    let Some(journal) = store.read_if_exists(Path::new(JOURNAL_KEY)).await? else {
        return Ok(());
    };
    let invalid = || ErrorKind::InvalidMetadata(JOURNAL_KEY.to_string());
    let pending = parse_repomd(&journal).or_raise(invalid)?;
    let current = match store.read_if_exists(Path::new(REPOMD_KEY)).await? {
        Some(index) => parse_repomd(&index).ok().map(|repomd| repomd.revision),
        None => None,
    };
    if current.is_some_and(|current| current >= pending.revision) {
        tracing::debug!(revision = pending.revision, "journal already published");
        forget(store).await;
        return Ok(());
    }

    for record in &pending.records {
        let location = Path::new(&record.location);
        if let Some(live) = store.read_if_exists(location).await?
            && record.matches(&live)
        {
            continue;
        }
        let staged = staged_key(&record.location)?;
        let data = store.read_if_exists(&staged).await?.ok_or_raise(|| {
            ErrorKind::InvalidMetadata(format!("{} is journaled but not staged", record.location))
        })?;
        verify(record, &data)?;
        store.write(location, &data).await?;
    }
    store.write(Path::new(REPOMD_KEY), &journal).await?;
    tracing::info!(revision = pending.revision, "finished an interrupted publish");
    forget(store).await;
    Ok(())
}

async fn forget(store: &Store) {
    if let Err(err) = store.delete(Path::new(JOURNAL_KEY)).await {
        tracing::warn!(error = ?err, "could not remove the publish journal");
    }
}
