//! Configuration Error Types

use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A source couldn't be read or didn't have the expected shape. The
    /// `figment` error naming the source and key is attached as a child.
    #[display("failed to load repository settings")]
    Load,
    /// A setting was read but its value isn't acceptable.
    #[display("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        false
    }
}
