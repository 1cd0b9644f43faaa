//! Compression errors.

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// An encoder or decoder could not be set up.
    #[display("could not initialise codec")]
    Encoder,
    /// Stored metadata doesn't decompress. Retrying the same bytes won't
    /// help.
    #[display("invalid or corrupted data")]
    InvalidData,
    #[display("unsupported format: {_0}")]
    UnsupportedFormat(#[error(not(source))] String),
    /// Known format, but this build leaves it out.
    #[display("format not enabled in this build: {_0}")]
    DisabledFormat(#[error(not(source))] String),
    /// The sink behind an encoder failed.
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Io)
    }
}
