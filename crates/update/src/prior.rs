//! The repository state a batch starts from.

use crate::error::{ErrorKind, Result};
use crate::staging;
use crate::store::Store;
use exn::{OptionExt, ResultExt};
use rpmrepo_compress::Compression;
use rpmrepo_metadata::{
    DataRecord, MetadataKind, REPOMD_KEY, merge_prior, parse_repomd, read_filelists, read_other, read_primary,
};
use rpmrepo_rpm::models::Package;
use std::io::Cursor;
use std::path::Path;
use tracing::instrument;

/// What `repomd.xml` currently publishes.
#[derive(Debug, Default)]
pub(crate) struct Prior {
    /// `None` when nothing has been published yet.
    pub revision: Option<u64>,
    pub records: Vec<DataRecord>,
    pub packages: Vec<Package>,
}

/// Read `repomd.xml` and every file it references, verify them and rebuild
/// the packages they describe.
#[instrument(skip_all, fields(revision, packages))]
pub(crate) async fn load(store: &Store) -> Result<Prior> {
    staging::recover(store).await?;
    let Some(index) = store.read_if_exists(Path::new(REPOMD_KEY)).await? else {
        tracing::debug!("no published metadata");
        return Ok(Prior::default());
    };
    let repomd = parse_repomd(&index).or_raise(|| ErrorKind::InvalidMetadata(REPOMD_KEY.to_string()))?;

    let mut files = Vec::with_capacity(repomd.records.len());
    for record in &repomd.records {
        let key = Path::new(&record.location);
        let data = match store.read_if_exists(key).await? {
            Some(data) => data,
            None => exn::bail!(ErrorKind::InvalidMetadata(format!("{} is referenced but missing", record.location))),
        };
        verify(record, &data)?;
        files.push((record.clone(), data));
    }

    let packages = tokio::task::spawn_blocking(move || decode(files))
        .await
        .or_raise(|| ErrorKind::Generation)??;
    let span = tracing::Span::current();
    span.record("revision", repomd.revision);
    span.record("packages", packages.len());
    Ok(Prior {
        revision: Some(repomd.revision),
        records: repomd.records,
        packages,
    })
}

/// The stored bytes must be the ones the record was published with.
pub(crate) fn verify(record: &DataRecord, data: &[u8]) -> Result<()> {
    if !record.matches(data) {
        exn::bail!(ErrorKind::ChecksumMismatch {
            key: record.location.clone(),
            expected: record.checksum.value.clone(),
            actual: record.checksum.digest.compute(data),
        });
    }
    Ok(())
}

fn decode(files: Vec<(DataRecord, Vec<u8>)>) -> Result<Vec<Package>> {
    let mut primary = None;
    let mut filelists = None;
    let mut other = None;
    for (record, data) in files {
        let invalid = || ErrorKind::InvalidMetadata(record.location.clone());
        let xml = Compression::from_path(&record.location).decompress(&data).or_raise(invalid)?;
        let xml = Cursor::new(xml);
        match record.kind {
            MetadataKind::Primary => primary = Some(read_primary(xml).or_raise(invalid)?),
            MetadataKind::Filelists => filelists = Some(read_filelists(xml).or_raise(invalid)?),
            MetadataKind::Other => other = Some(read_other(xml).or_raise(invalid)?),
        }
    }
    let primary = primary.ok_or_raise(|| ErrorKind::InvalidMetadata(format!("{REPOMD_KEY} lists no primary")))?;
    if filelists.is_none() && !primary.is_empty() {
        tracing::warn!("no filelists published; file lists are limited to what primary lists");
    }
    merge_prior(primary, filelists, other).or_raise(|| ErrorKind::InvalidMetadata(REPOMD_KEY.to_string()))
}
