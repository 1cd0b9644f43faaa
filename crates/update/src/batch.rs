use rpmrepo_metadata::DataRecord;
use rpmrepo_rpm::models::Nevra;
use std::path::PathBuf;

/// Packages to add and remove in one atomic step.
///
/// # Examples
///
/// ```
/// use rpmrepo_update::Batch;
///
/// let batch = Batch::new()
///     .add("x86_64/time-1.7-45.el7.x86_64.rpm")
///     .remove("time-1.7-44.el7.x86_64".parse().unwrap());
/// assert_eq!(batch.add.len(), 1);
/// assert_eq!(batch.remove.len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    /// Keys of RPMs to add, in order. A later package with the same NEVRA
    /// as an earlier one wins.
    pub add: Vec<PathBuf>,
    /// Packages to drop from the metadata. The RPM files are left alone.
    pub remove: Vec<Nevra>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, key: impl Into<PathBuf>) -> Self {
        self.add.push(key.into());
        self
    }

    pub fn remove(mut self, nevra: Nevra) -> Self {
        self.remove.push(nevra);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

/// What a published batch changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    pub revision: u64,
    /// Packages in the repository after the batch.
    pub packages: usize,
    pub added: usize,
    /// Same NEVRA, different checksum.
    pub replaced: usize,
    /// Same NEVRA, same checksum.
    pub unchanged: usize,
    pub removed: usize,
    /// The `repomd.xml` entries now published.
    pub records: Vec<DataRecord>,
}
