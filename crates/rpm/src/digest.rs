//! Checksum algorithms used for package ids and metadata files.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sha1::Sha1;
use sha2::{Digest as _, Sha256};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::io::{self, Read, Write};
use std::str::FromStr;

/// Supported checksum algorithms.
///
/// Closed set: anything else is rejected while the configuration is parsed,
/// never during an update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Digest {
    #[default]
    Sha256,
    Sha1,
}

impl Digest {
    /// Name used for the `type` attribute of `<checksum>` elements.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha1 => "sha1",
        }
    }

    pub fn hasher(&self) -> Hasher {
        match self {
            Self::Sha256 => Hasher::Sha256(Sha256::new()),
            Self::Sha1 => Hasher::Sha1(Sha1::new()),
        }
    }

    /// Lowercase hex digest of a byte slice.
    ///
    /// # Examples
    ///
    /// ```
    /// use rpmrepo_rpm::Digest;
    /// assert_eq!(
    ///     Digest::Sha1.compute(b"abc"),
    ///     "a9993e364706816aba3e25717850c26c9cd0d89d"
    /// );
    /// ```
    pub fn compute(&self, bytes: &[u8]) -> String {
        let mut hasher = self.hasher();
        hasher.update(bytes);
        hasher.finalize()
    }

    /// Lowercase hex digest of everything a reader yields.
    pub fn compute_reader(&self, mut reader: impl Read) -> Result<String> {
        let mut hasher = self.hasher();
        io::copy(&mut reader, &mut hasher).or_raise(|| ErrorKind::Io)?;
        Ok(hasher.finalize())
    }
}

impl FromStr for Digest {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sha256" | "sha-256" => Ok(Self::Sha256),
            "sha1" | "sha-1" | "sha" => Ok(Self::Sha1),
            _ => exn::bail!(ErrorKind::UnsupportedDigest(s.to_string())),
        }
    }
}

impl Display for Digest {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Incremental hasher for one [`Digest`].
///
/// Implements [`Write`] so it can sit anywhere in a writer pipeline.
#[derive(Clone)]
pub enum Hasher {
    Sha256(Sha256),
    Sha1(Sha1),
}

impl Hasher {
    pub fn update(&mut self, bytes: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(bytes),
            Self::Sha1(h) => h.update(bytes),
        }
    }

    pub fn finalize(self) -> String {
        match self {
            Self::Sha256(h) => hex::encode(h.finalize()),
            Self::Sha1(h) => hex::encode(h.finalize()),
        }
    }
}

impl Write for Hasher {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
