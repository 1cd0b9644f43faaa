use rpmrepo_compress::Compression;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

pub(crate) const NS_COMMON: &str = "http://linux.duke.edu/metadata/common";
pub(crate) const NS_RPM: &str = "http://linux.duke.edu/metadata/rpm";
pub(crate) const NS_FILELISTS: &str = "http://linux.duke.edu/metadata/filelists";
pub(crate) const NS_OTHER: &str = "http://linux.duke.edu/metadata/other";
pub(crate) const NS_REPO: &str = "http://linux.duke.edu/metadata/repo";

/// The three metadata streams, in `repomd.xml` order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetadataKind {
    Primary,
    Filelists,
    Other,
}

impl MetadataKind {
    pub const ALL: [MetadataKind; 3] = [Self::Primary, Self::Filelists, Self::Other];

    /// Value of `<data type="...">` in `repomd.xml`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Filelists => "filelists",
            Self::Other => "other",
        }
    }

    pub(crate) fn root_element(&self) -> &'static str {
        match self {
            Self::Primary => "metadata",
            Self::Filelists => "filelists",
            Self::Other => "otherdata",
        }
    }

    pub(crate) fn namespace(&self) -> &'static str {
        match self {
            Self::Primary => NS_COMMON,
            Self::Filelists => NS_FILELISTS,
            Self::Other => NS_OTHER,
        }
    }

    /// Logical file name before the naming policy is applied.
    ///
    /// ```
    /// use rpmrepo_compress::Compression;
    /// use rpmrepo_metadata::MetadataKind;
    /// assert_eq!(MetadataKind::Filelists.file_name(Compression::Gzip), "filelists.xml.gz");
    /// ```
    pub fn file_name(&self, compression: Compression) -> String {
        compression.file_name(&format!("{}.xml", self.as_str()))
    }
}

impl FromStr for MetadataKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s).ok_or(())
    }
}

impl Display for MetadataKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
