//! RPM package parsing for repository metadata.
//!
//! An RPM file is a 96-byte lead, a signature header, the main header and a
//! compressed payload. Repository metadata only ever needs the two headers;
//! the payload is never touched.
//!
//! ```text
//! lead (96) | signature header | pad to 8 | main header | payload
//! ```
//!
//! The bytes come from uploads and are untrusted. [`parse`] is the boundary
//! where they either become a [`Package`](models::Package) or are rejected.

mod digest;
pub mod error;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod header;
mod lead;
pub mod models;
mod parse;

pub use crate::digest::{Digest, Hasher};
pub use crate::lead::{Lead, is_rpm};
pub use crate::parse::{ParseOptions, parse, parse_with};
