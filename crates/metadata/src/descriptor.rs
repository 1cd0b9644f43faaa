use crate::MetadataKind;
use rpmrepo_rpm::models::Checksum;

/// One `<data>` element of `repomd.xml`: where a metadata file lives and
/// how to verify it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRecord {
    pub kind: MetadataKind,
    /// Key relative to the repository root (`repodata/<name>`)
    pub location: String,
    /// Checksum of the stored (compressed) bytes
    pub checksum: Checksum,
    /// Checksum of the uncompressed XML
    pub open_checksum: Checksum,
    /// Stored (compressed) size in bytes
    pub size: u64,
    /// Uncompressed size in bytes
    pub open_size: u64,
    /// Seconds since the Unix epoch
    pub timestamp: u64,
}

impl DataRecord {
    /// Whether `bytes` are exactly the file this record describes.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        bytes.len() as u64 == self.size && self.checksum.digest.compute(bytes) == self.checksum.value
    }
}

/// A finished metadata file, ready to be stored and indexed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDescriptor {
    pub record: DataRecord,
    pub package_count: usize,
    /// The compressed bytes, held until they are committed to storage.
    pub data: Vec<u8>,
}
