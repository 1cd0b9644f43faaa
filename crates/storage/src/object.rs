//! Object metadata returned by listing and stat operations.

use std::path::PathBuf;
use time::OffsetDateTime;

/// Metadata about a stored object, without its contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    /// Key relative to the storage root
    pub key: PathBuf,
    /// Object size in bytes
    pub size: u64,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
}
impl ObjectInfo {
    pub fn new(key: impl Into<PathBuf>, size: u64, modified: OffsetDateTime) -> Self {
        Self {
            key: key.into(),
            size,
            modified,
        }
    }

    /// Whether the key looks like an RPM package (by extension).
    pub fn is_rpm(&self) -> bool {
        self.key.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("rpm"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_rpm() {
        let now = OffsetDateTime::now_utc();
        assert!(ObjectInfo::new("time-1.7-45.el7.x86_64.rpm", 1, now).is_rpm());
        assert!(ObjectInfo::new("x86_64/TIME.RPM", 1, now).is_rpm());
        assert!(!ObjectInfo::new("repodata/repomd.xml", 1, now).is_rpm());
        assert!(!ObjectInfo::new("rpm", 1, now).is_rpm());
    }
}
