//! Choosing a format by configured name or by stored file name.

use crate::Compression;
use crate::error::{Error, ErrorKind};
use std::path::Path;
use std::str::FromStr;

impl Compression {
    /// Every format this build can read and write.
    pub const ENABLED: &'static [Compression] = &[
        Compression::None,
        Compression::Bzip2,
        Compression::Gzip,
        #[cfg(feature = "xz")]
        Compression::Xz,
        #[cfg(feature = "zstd")]
        Compression::Zstd,
    ];

    /// Format of a stored metadata file, judged by its last extension.
    ///
    /// `repodata/<digest>-primary.xml.gz` is gzip. `repomd.xml` and anything
    /// unrecognised is read as-is.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let Some(extension) = path.as_ref().extension().and_then(|ext| ext.to_str()) else {
            return Compression::None;
        };
        Self::ENABLED
            .iter()
            .copied()
            .find(|format| format.bare_extension().is_some_and(|known| known.eq_ignore_ascii_case(extension)))
            .unwrap_or(Compression::None)
    }

    fn bare_extension(&self) -> Option<&'static str> {
        self.extension().strip_prefix('.')
    }
}

/// Accepts the configuration names (`gzip`, `bzip2`) as well as bare
/// extensions (`gz`, `bz2`).
impl FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        if name == "plain" {
            return Ok(Compression::None);
        }
        let enabled = Self::ENABLED
            .iter()
            .copied()
            .find(|format| format.as_str() == name || format.bare_extension() == Some(name.as_str()));
        match (enabled, name.as_str()) {
            (Some(format), _) => Ok(format),
            (None, "xz" | "lzma" | "zst" | "zstd") => exn::bail!(ErrorKind::DisabledFormat(s.to_string())),
            (None, _) => exn::bail!(ErrorKind::UnsupportedFormat(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Compression;
    use crate::error::ErrorKind;
    use rstest::rstest;

    #[rstest]
    #[case("none", Compression::None)]
    #[case("plain", Compression::None)]
    #[case("gz", Compression::Gzip)]
    #[case(" GZIP ", Compression::Gzip)]
    #[case("bz2", Compression::Bzip2)]
    #[case("bzip2", Compression::Bzip2)]
    #[cfg_attr(feature = "xz", case("xz", Compression::Xz))]
    #[cfg_attr(feature = "zstd", case("zst", Compression::Zstd))]
    fn test_from_str(#[case] name: &str, #[case] expected: Compression) {
        assert_eq!(name.parse::<Compression>().unwrap(), expected);
    }

    #[rstest]
    #[case("lz4")]
    #[case("")]
    #[case("gzip2")]
    fn test_from_str_unsupported(#[case] name: &str) {
        let err = name.parse::<Compression>().unwrap_err();
        assert_eq!(*err, ErrorKind::UnsupportedFormat(name.to_string()));
    }

    #[cfg(not(feature = "xz"))]
    #[test]
    fn test_from_str_disabled() {
        let err = "xz".parse::<Compression>().unwrap_err();
        assert_eq!(*err, ErrorKind::DisabledFormat("xz".to_string()));
    }

    #[rstest]
    #[case("repodata/repomd.xml", Compression::None)]
    #[case("repodata/primary.xml.gz", Compression::Gzip)]
    #[case("repodata/0a1b2c-filelists.xml.bz2", Compression::Bzip2)]
    #[case("repodata/other.xml.GZ", Compression::Gzip)]
    // A bare dotfile has no extension.
    #[case(".gz", Compression::None)]
    #[cfg_attr(feature = "xz", case("repodata/primary.xml.xz", Compression::Xz))]
    #[cfg_attr(feature = "zstd", case("repodata/primary.xml.zst", Compression::Zstd))]
    fn test_from_path(#[case] path: &str, #[case] expected: Compression) {
        assert_eq!(Compression::from_path(path), expected);
    }

    #[test]
    fn test_every_enabled_format_round_trips_its_name() {
        for &format in Compression::ENABLED {
            assert_eq!(format.as_str().parse::<Compression>().unwrap(), format);
            assert_eq!(Compression::from_path(format.file_name("primary.xml")), format);
        }
    }
}
