//! RPM Parsing Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A parsing error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for parsing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// The structural kinds mean the input is not a usable RPM and never will
/// be: reject the upload.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A section declares more bytes than the input holds.
    #[display("truncated {section}: need {needed} bytes, {available} available")]
    Truncated {
        section: &'static str,
        needed: usize,
        available: usize,
    },
    /// Magic number mismatch; the input is not an RPM (or not at this offset).
    #[display("bad {_0} magic")]
    BadMagic(#[error(not(source))] &'static str),
    /// The lead announces a signature format other than a header signature.
    #[display("unsupported signature type {_0}")]
    UnsupportedSignature(#[error(not(source))] i16),
    /// An index entry, string or directory index points outside its bounds.
    #[display("{_0} out of range")]
    OutOfRange(#[error(not(source))] &'static str),
    /// A tag every package must carry is missing.
    #[display("missing required tag: {_0}")]
    MissingTag(#[error(not(source))] &'static str),
    /// A package identity string couldn't be split into its parts.
    #[display("invalid package identity: {_0}")]
    InvalidNevra(#[error(not(source))] String),
    /// Configuration named a digest algorithm that isn't supported.
    #[display("unsupported digest algorithm: {_0}")]
    UnsupportedDigest(#[error(not(source))] String),
    /// Reading the input stream failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io)
    }

    /// Returns `true` if the input failed structural validation.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, Self::Io | Self::UnsupportedDigest(_) | Self::InvalidNevra(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::Truncated {
                section: "lead",
                needed: 96,
                available: 10
            }
            .to_string(),
            "truncated lead: need 96 bytes, 10 available"
        );
        assert_eq!(ErrorKind::MissingTag("NAME").to_string(), "missing required tag: NAME");
    }

    #[test]
    fn error_kind_classification() {
        assert!(ErrorKind::BadMagic("lead").is_malformed());
        assert!(ErrorKind::OutOfRange("dirname index").is_malformed());
        assert!(!ErrorKind::Io.is_malformed());
        assert!(!ErrorKind::UnsupportedDigest("md5".into()).is_malformed());
        assert!(ErrorKind::Io.is_retryable());
        assert!(!ErrorKind::BadMagic("header").is_retryable());
    }
}
