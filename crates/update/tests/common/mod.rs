//! Shared setup for the end-to-end batch tests.
#![allow(dead_code)]

use rpmrepo_compress::Compression;
use rpmrepo_config::RepoConfig;
use rpmrepo_metadata::{
    MetadataKind, REPOMD_KEY, Repomd, merge_prior, parse_repomd, read_filelists, read_other, read_primary,
};
use rpmrepo_rpm::fixtures::Builder;
use rpmrepo_rpm::models::Package;
use rpmrepo_storage::StorageBackend;
use rpmrepo_storage::backend::MockBackend;
use rpmrepo_update::{LeaseRegistry, UpdateCoordinator};
use std::collections::{BTreeMap, HashSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const REPO: &str = "el7-x86_64";

/// A small binary package with one executable.
pub fn builder(name: &str, version: &str) -> Builder {
    Builder::new(name, version, "1.el7", "x86_64")
        .summary(format!("The {name} program"))
        .file(format!("/usr/bin/{name}"), 0o100755, 0)
        .file(format!("/usr/share/doc/{name}/README"), 0o100644, 0x02)
        .changelog(1_600_000_000, format!("Packager <packager@example.com> - {version}-1"), "- Initial build")
}

pub fn rpm(name: &str, version: &str) -> Vec<u8> {
    builder(name, version).build()
}

pub fn key(name: &str, version: &str) -> PathBuf {
    PathBuf::from(format!("x86_64/{name}-{version}-1.el7.x86_64.rpm"))
}

pub fn backend(packages: &[(&str, &str)]) -> Arc<MockBackend> {
    Arc::new(MockBackend::with_files(
        packages.iter().map(|(name, version)| (key(name, version), rpm(name, version))),
    ))
}

pub fn coordinator(backend: &Arc<MockBackend>, config: RepoConfig) -> UpdateCoordinator {
    UpdateCoordinator::new(REPO, backend.clone(), config, LeaseRegistry::new())
}

/// Every stored key and its bytes.
pub async fn snapshot(backend: &MockBackend) -> BTreeMap<PathBuf, Vec<u8>> {
    let mut files = BTreeMap::new();
    for key in backend.keys().await {
        let data = backend.read(&key).await.unwrap();
        files.insert(key, data);
    }
    files
}

/// What a client would see.
#[derive(Debug)]
pub struct Published {
    pub repomd: Repomd,
    /// Full packages, sorted by NEVRA.
    pub packages: Vec<Package>,
}

impl Published {
    pub fn nevras(&self) -> Vec<String> {
        self.packages.iter().map(|package| package.nevra.to_string()).collect()
    }

    pub fn locations(&self) -> Vec<&str> {
        self.packages.iter().map(|package| package.location.as_str()).collect()
    }
}

/// Read the published repository like a client does, checking that every
/// file matches its record and that the metadata files agree with each
/// other.
pub async fn published(backend: &MockBackend) -> Option<Published> {
    let index = match backend.read(Path::new(REPOMD_KEY)).await {
        Ok(index) => index,
        Err(err) if err.is_not_found() => return None,
        Err(err) => panic!("reading repomd.xml: {err:?}"),
    };
    let repomd = parse_repomd(&index).unwrap();
    let mut documents = BTreeMap::new();
    for record in &repomd.records {
        let data = backend.read(Path::new(&record.location)).await.unwrap();
        assert!(record.matches(&data), "{} doesn't match repomd.xml", record.location);
        let xml = Compression::from_path(&record.location).decompress(&data).unwrap();
        assert_eq!(xml.len() as u64, record.open_size);
        documents.insert(record.kind, xml);
    }

    let primary = read_primary(Cursor::new(&documents[&MetadataKind::Primary])).unwrap();
    let filelists = documents.get(&MetadataKind::Filelists).map(|xml| read_filelists(Cursor::new(xml)).unwrap());
    let other = documents.get(&MetadataKind::Other).map(|xml| read_other(Cursor::new(xml)).unwrap());
    let ids: HashSet<&str> = primary.iter().map(Package::pkgid).collect();
    if let Some(filelists) = &filelists {
        assert_eq!(ids, filelists.iter().map(|p| p.pkgid.as_str()).collect());
    }
    if let Some(other) = &other {
        assert_eq!(ids, other.iter().map(|p| p.pkgid.as_str()).collect());
    }

    let mut packages = merge_prior(primary, filelists, other).unwrap();
    packages.sort_by(|a, b| a.nevra.cmp(&b.nevra));
    Some(Published { repomd, packages })
}
