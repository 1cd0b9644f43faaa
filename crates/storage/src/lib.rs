//! Blob storage for RPM repositories.
//!
//! The metadata engine treats storage as an opaque key-value store: RPM
//! uploads, `repodata/*.xml.gz` and `repodata/repomd.xml` are all just keys
//! with bytes behind them. [`StorageBackend`] is that boundary.

pub mod backend;
pub mod error;
mod key;
mod object;

pub use crate::backend::StorageBackend;
pub use crate::key::{file_name, join as join_key, validate as validate_key};
pub use crate::object::ObjectInfo;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
