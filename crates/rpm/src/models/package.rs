use super::{Changelog, FileEntry, Nevra, Relations};
use crate::Digest;

/// Checksum of a whole RPM file; its value is the metadata `pkgid`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Checksum {
    pub digest: Digest,
    /// Lowercase hex
    pub value: String,
}
impl Checksum {
    pub fn new(digest: Digest, value: impl Into<String>) -> Self {
        Self {
            digest,
            value: value.into(),
        }
    }

    pub fn of(digest: Digest, bytes: &[u8]) -> Self {
        Self::new(digest, digest.compute(bytes))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Sizes {
    /// Length of the RPM file
    pub package: u64,
    /// Sum of installed file sizes
    pub installed: u64,
    /// Uncompressed payload size
    pub archive: u64,
}

/// Timestamps in seconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Times {
    /// When the RPM was added to the repository
    pub file: u64,
    pub build: u64,
    /// Always 0 for packages that were never installed
    pub install: u64,
}

/// Byte offsets `[start, end)` of the main header within the RPM file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HeaderRange {
    pub start: u64,
    pub end: u64,
}

/// Digests of the main header carried in the signature header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SignatureDigests {
    pub sha256: Option<String>,
    pub sha1: Option<String>,
    pub md5: Option<String>,
}

/// Everything repository metadata says about one RPM file.
///
/// Built once, either by [`parse`](crate::parse) from the package bytes or
/// by reading previously published metadata back, and not mutated after.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    pub nevra: Nevra,
    pub checksum: Checksum,
    pub summary: String,
    pub description: String,
    pub url: String,
    pub packager: String,
    pub vendor: String,
    pub license: String,
    pub group: String,
    pub build_host: String,
    /// File name of the source RPM; empty for source packages.
    pub source_rpm: String,
    pub time: Times,
    pub size: Sizes,
    pub header_range: HeaderRange,
    pub relations: Relations,
    pub files: Vec<FileEntry>,
    /// Oldest first.
    pub changelogs: Vec<Changelog>,
    pub signature: SignatureDigests,
    /// Key of the RPM relative to the repository root.
    pub location: String,
}
impl Package {
    pub fn pkgid(&self) -> &str {
        &self.checksum.value
    }

    pub fn is_source(&self) -> bool {
        self.nevra.arch == "src" || self.nevra.arch == "nosrc"
    }
}
