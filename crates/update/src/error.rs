//! Update Error Types
//!
//! Structured errors using `exn` for automatic location tracking and error
//! tree construction. Storage, parser and metadata errors are attached as
//! children of the kind that describes what the batch was doing.

use derive_more::{Display, Error};

/// An update error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for update operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a batch update did not publish.
///
/// Every kind means the published repository is as it was before the
/// batch, apart from unreferenced files. The one exception is a storage
/// failure after a staged batch stored its journal: that batch is finished
/// by the next one.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An added key is not a valid RPM.
    #[display("malformed package: {_0}")]
    MalformedPackage(#[error(not(source))] String),
    /// An added key does not exist.
    #[display("package not found: {_0}")]
    PackageNotFound(#[error(not(source))] String),
    /// Another batch holds the repository and the policy is to fail fast.
    #[display("update already in progress for {_0}")]
    UpdateInProgress(#[error(not(source))] String),
    /// A storage operation failed or timed out.
    #[display("storage unavailable")]
    StorageUnavailable,
    /// Stored bytes don't match the checksum they were published or written
    /// with.
    #[display("checksum mismatch for {key}: expected {expected}, found {actual}")]
    ChecksumMismatch {
        key: String,
        expected: String,
        actual: String,
    },
    /// Published metadata can't be read back.
    #[display("invalid metadata: {_0}")]
    InvalidMetadata(#[error(not(source))] String),
    /// The batch was cancelled before it published.
    #[display("update cancelled")]
    Cancelled,
    /// Metadata generation failed.
    #[display("metadata generation failed")]
    Generation,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::UpdateInProgress(_) | Self::StorageUnavailable)
    }
}
