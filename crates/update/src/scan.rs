//! Working out a batch from what is actually stored.

use crate::Batch;
use crate::error::Result;
use crate::store::Store;
use rpmrepo_rpm::models::Package;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// RPMs under `prefix` that the metadata doesn't reference are added;
/// packages under `prefix` whose file is gone are removed.
#[instrument(skip_all, fields(prefix = ?prefix, add, remove))]
pub(crate) async fn plan(store: &Store, packages: &[Package], prefix: Option<&Path>) -> Result<Batch> {
    let mut stored: Vec<PathBuf> = store
        .list(prefix)
        .await?
        .into_iter()
        .filter(|info| info.is_rpm() && !info.key.starts_with("repodata"))
        .map(|info| info.key)
        .collect();
    stored.sort();
    let present: HashSet<String> = stored.iter().map(|key| key.to_string_lossy().into_owned()).collect();
    let referenced: HashSet<&str> = packages.iter().map(|package| package.location.as_str()).collect();

    let mut batch = Batch::new();
    for key in stored {
        if !referenced.contains(key.to_string_lossy().as_ref()) {
            batch = batch.add(key);
        }
    }
    for package in packages {
        let in_scope = prefix.is_none_or(|prefix| Path::new(&package.location).starts_with(prefix));
        if in_scope && !present.contains(&package.location) {
            batch = batch.remove(package.nevra.clone());
        }
    }
    let span = tracing::Span::current();
    span.record("add", batch.add.len());
    span.record("remove", batch.remove.len());
    Ok(batch)
}
