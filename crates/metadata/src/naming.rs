//! Stored file names for generated metadata.

use crate::error::{Error, ErrorKind};
use rpmrepo_rpm::Digest;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Maps a logical file name (`primary.xml.gz`) to the name it is stored
/// under.
///
/// Clients cache metadata by name, so a policy must be referentially
/// transparent: the same content always gets the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamingPolicy {
    /// Stored under the logical name.
    Plain,
    /// `<hex digest of content>-<logical name>`.
    HashPrefixed(Digest),
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self::HashPrefixed(Digest::Sha256)
    }
}

impl NamingPolicy {
    /// # Examples
    ///
    /// ```
    /// use rpmrepo_metadata::NamingPolicy;
    /// use rpmrepo_rpm::Digest;
    ///
    /// assert_eq!(NamingPolicy::Plain.name_for("other.xml.gz", b"..."), "other.xml.gz");
    /// assert_eq!(
    ///     NamingPolicy::HashPrefixed(Digest::Sha1).name_for("other.xml.gz", b"abc"),
    ///     "a9993e364706816aba3e25717850c26c9cd0d89d-other.xml.gz"
    /// );
    /// ```
    pub fn name_for(&self, logical_name: &str, content: &[u8]) -> String {
        match self {
            Self::Plain => logical_name.to_string(),
            Self::HashPrefixed(digest) => format!("{}-{logical_name}", digest.compute(content)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::HashPrefixed(Digest::Sha256) => "sha256",
            Self::HashPrefixed(Digest::Sha1) => "sha1",
        }
    }
}

impl FromStr for NamingPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "plain" | "none" => Ok(Self::Plain),
            other => match other.parse::<Digest>() {
                Ok(digest) => Ok(Self::HashPrefixed(digest)),
                Err(_) => exn::bail!(ErrorKind::UnsupportedNaming(s.to_string())),
            },
        }
    }
}

impl Display for NamingPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}
