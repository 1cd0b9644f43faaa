//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, the only thing the
//! metadata engine knows about where RPMs and `repodata/` live.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::{MockBackend, Operation};
use crate::ObjectInfo;
use crate::error::Result;
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::path::Path;
use std::pin::Pin;

pub type ObjectInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<ObjectInfo>> + Send + 'a>>;

/// Unified interface for blob storage backends.
///
/// All operations are asynchronous; every call is a suspension point for a
/// batch update and nothing else is. Keys are relative to the storage root
/// and must be validated with [`validate_key`](crate::validate_key) by the
/// implementation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use rpmrepo_storage::{backend::StorageBackend, error::Result};
///
/// async fn is_published(backend: &dyn StorageBackend) -> Result<bool> {
///     backend.exists(Path::new("repodata/repomd.xml")).await
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend (used for logging only).
    fn name(&self) -> &str;

    /// List all objects under an optional key prefix.
    ///
    /// Default implementation collects [`list_stream()`](Self::list_stream)
    /// into a [`Vec`].
    async fn list(&self, prefix: Option<&Path>) -> Result<Vec<ObjectInfo>> {
        self.list_stream(prefix).try_collect().await
    }

    /// Stream object metadata under an optional key prefix.
    ///
    /// Prefix matching is component-based: the prefix `x86_64` matches
    /// `x86_64/a.rpm` but not `x86_64-old/a.rpm`. A prefix that doesn't exist
    /// yields an empty stream, not an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use futures::TryStreamExt;
    /// use std::path::Path;
    /// # use rpmrepo_storage::{backend::StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.list_stream(Some(Path::new("x86_64")));
    /// while let Some(info) = stream.try_next().await? {
    ///     println!("{}: {} bytes", info.key.display(), info.size);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> ObjectInfoStream<'a>;

    /// Check if a key exists.
    async fn exists(&self, key: &Path) -> Result<bool>;

    /// Read the complete contents of a key.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the key
    /// does not exist.
    async fn read(&self, key: &Path) -> Result<Vec<u8>>;

    /// Write the contents of a key, replacing anything already there.
    ///
    /// # Notes
    /// - Implementations should create intermediate "directories" as needed.
    /// - A successful return means the bytes are durably stored: the batch
    ///   update relies on this before it publishes `repomd.xml`.
    async fn write(&self, key: &Path, data: &[u8]) -> Result<()>;

    /// Delete a key.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the key
    /// does not exist.
    async fn delete(&self, key: &Path) -> Result<()>;

    /// Get object metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the key
    /// does not exist.
    async fn stat(&self, key: &Path) -> Result<ObjectInfo>;
}
