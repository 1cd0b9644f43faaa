//! Metadata Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction.

use derive_more::{Display, Error};

/// A metadata error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for metadata operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Serializing XML into the output pipeline failed.
    #[display("failed to write {_0} XML")]
    Xml(#[error(not(source))] &'static str),
    /// The compressor failed; the compression error is attached as a child.
    #[display("failed to compress {_0}")]
    Compression(#[error(not(source))] &'static str),
    /// A writer was finished with a different number of packages than it
    /// declared up front. This is a bug in the caller.
    #[display("{kind} declared {declared} packages but {written} were written")]
    CountMismatch {
        kind: &'static str,
        declared: usize,
        written: usize,
    },
    /// Previously published metadata can't be read back.
    #[display("invalid metadata: {_0}")]
    InvalidMetadata(#[error(not(source))] String),
    /// Configuration named a naming policy that doesn't exist.
    #[display("unsupported naming policy: {_0}")]
    UnsupportedNaming(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Generation is a pure function of its input, and published
        // metadata doesn't fix itself.
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(
            ErrorKind::CountMismatch {
                kind: "primary",
                declared: 2,
                written: 1
            }
            .to_string(),
            "primary declared 2 packages but 1 were written"
        );
        assert_eq!(ErrorKind::UnsupportedNaming("md5".into()).to_string(), "unsupported naming policy: md5");
    }
}
