//! Storage calls with a deadline.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use futures::TryStreamExt;
use rpmrepo_storage::error::Result as StorageResult;
use rpmrepo_storage::{BackendHandle, ObjectInfo};
use std::future::Future;
use std::path::Path;
use std::time::Duration;

/// A backend whose every operation must finish within `timeout`.
#[derive(Clone)]
pub(crate) struct Store {
    backend: BackendHandle,
    timeout: Duration,
}

impl Store {
    pub(crate) fn new(backend: BackendHandle, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    async fn timed<T>(
        &self,
        operation: &str,
        key: &Path,
        call: impl Future<Output = StorageResult<T>>,
    ) -> Result<StorageResult<T>> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => Ok(result),
            Err(_) => {
                tracing::warn!(
                    backend = self.backend.name(),
                    operation,
                    key = %key.display(),
                    timeout = ?self.timeout,
                    "storage operation timed out"
                );
                exn::bail!(ErrorKind::StorageUnavailable)
            },
        }
    }

    pub(crate) async fn read(&self, key: &Path) -> Result<Vec<u8>> {
        self.timed("read", key, self.backend.read(key)).await?.or_raise(|| ErrorKind::StorageUnavailable)
    }

    /// `None` when the key doesn't exist.
    pub(crate) async fn read_if_exists(&self, key: &Path) -> Result<Option<Vec<u8>>> {
        match self.timed("read", key, self.backend.read(key)).await? {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err).or_raise(|| ErrorKind::StorageUnavailable),
        }
    }

    pub(crate) async fn write(&self, key: &Path, data: &[u8]) -> Result<()> {
        self.timed("write", key, self.backend.write(key, data)).await?.or_raise(|| ErrorKind::StorageUnavailable)
    }

    pub(crate) async fn delete(&self, key: &Path) -> Result<()> {
        self.timed("delete", key, self.backend.delete(key)).await?.or_raise(|| ErrorKind::StorageUnavailable)
    }

    /// Everything under `prefix`, collected within a single deadline.
    pub(crate) async fn list(&self, prefix: Option<&Path>) -> Result<Vec<ObjectInfo>> {
        let key = prefix.unwrap_or(Path::new(""));
        let listing = self.backend.list_stream(prefix).try_collect::<Vec<_>>();
        self.timed("list", key, listing).await?.or_raise(|| ErrorKind::StorageUnavailable)
    }
}
