//! In-memory storage backend for testing.

use super::ObjectInfoStream;
use crate::error::{ErrorKind, Result};
use crate::{ObjectInfo, StorageBackend, validate_key};
use async_stream::stream;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::RwLock;

type KeyPredicate = Box<dyn Fn(&Path) -> bool + Send + Sync>;

/// A mutating or reading call recorded by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Read(PathBuf),
    Write(PathBuf),
    Delete(PathBuf),
}

/// In-memory storage backend for testing.
///
/// Objects are stored in a `HashMap` behind a [`RwLock`], so all trait
/// methods can operate on `&self` without external synchronisation. On top of
/// plain storage it can inject latency and failures and it keeps an ordered
/// log of every read, write and delete, which is what lets tests assert that
/// `repomd.xml` is always the last thing written.
///
/// # Examples
///
/// ```
/// use rpmrepo_storage::backend::{MockBackend, StorageBackend};
/// use std::path::Path;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("x86_64/time-1.7-45.el7.x86_64.rpm", b"\xed\xab\xee\xdb"),
/// ]);
/// assert!(backend.exists(Path::new("x86_64/time-1.7-45.el7.x86_64.rpm")).await?);
///
/// backend.write(Path::new("repodata/repomd.xml"), b"<repomd/>").await?;
/// assert_eq!(backend.writes().await.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<PathBuf, (OffsetDateTime, Vec<u8>)>>,
    log: RwLock<Vec<Operation>>,
    failing_reads: RwLock<Option<KeyPredicate>>,
    failing_writes: RwLock<Option<KeyPredicate>>,
    latency: Option<Duration>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with objects.
    ///
    /// Panics if any key fails validation (e.g. traversal). If test setup is
    /// wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        let now = OffsetDateTime::now_utc();
        for (key, data) in files {
            let key = key.into();
            let Ok(validated) = validate_key(&key) else {
                panic!("MockBackend::with_files: invalid key {}", key.display());
            };
            map.insert(validated, (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            log: RwLock::new(Vec::new()),
            failing_reads: RwLock::new(None),
            failing_writes: RwLock::new(None),
            latency: None,
        }
    }

    /// Change the name of the mock backend.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Delay every operation by `latency` (uses `tokio::time::sleep`, so
    /// paused-clock tests stay fast).
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every write to a key matching `predicate` fail with a retryable
    /// [`Network`](ErrorKind::Network) error. Replaces any previous predicate.
    pub async fn fail_writes_matching(&self, predicate: impl Fn(&Path) -> bool + Send + Sync + 'static) {
        *self.failing_writes.write().await = Some(Box::new(predicate));
    }

    /// Make every read of a key matching `predicate` fail.
    pub async fn fail_reads_matching(&self, predicate: impl Fn(&Path) -> bool + Send + Sync + 'static) {
        *self.failing_reads.write().await = Some(Box::new(predicate));
    }

    /// Remove all injected failures.
    pub async fn clear_failures(&self) {
        *self.failing_reads.write().await = None;
        *self.failing_writes.write().await = None;
    }

    /// Every recorded operation, in call order.
    pub async fn operations(&self) -> Vec<Operation> {
        self.log.read().await.clone()
    }

    /// Keys of successful writes, in call order.
    pub async fn writes(&self) -> Vec<PathBuf> {
        self.log
            .read()
            .await
            .iter()
            .filter_map(|op| match op {
                Operation::Write(key) => Some(key.clone()),
                _ => None,
            })
            .collect()
    }

    /// Forget recorded operations.
    pub async fn clear_log(&self) {
        self.log.write().await.clear();
    }

    /// All stored keys, sorted.
    pub async fn keys(&self) -> Vec<PathBuf> {
        let mut keys: Vec<PathBuf> = self.storage.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    async fn check(&self, predicate: &RwLock<Option<KeyPredicate>>, key: &Path) -> Result<()> {
        if predicate.read().await.as_ref().is_some_and(|p| p(key)) {
            exn::bail!(ErrorKind::Network(format!("injected failure for {}", key.display())));
        }
        Ok(())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> ObjectInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_key).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            self.delay().await;
            // Snapshot matching entries under the read lock, then drop it
            // before yielding to avoid holding the lock across yield points.
            let mut entries: Vec<ObjectInfo> = {
                let guard = self.storage.read().await;
                guard
                    .iter()
                    .filter(|(key, _)| match &validated_prefix {
                        Some(pfx) => key.starts_with(pfx),
                        None => true,
                    })
                    .map(|(key, (modified, data))| ObjectInfo::new(key.clone(), data.len() as u64, *modified))
                    .collect()
            };
            entries.sort_by(|a, b| a.key.cmp(&b.key));
            for entry in entries {
                yield Ok(entry);
            }
        })
    }

    async fn exists(&self, key: &Path) -> Result<bool> {
        let key = validate_key(key)?;
        self.delay().await;
        Ok(self.storage.read().await.contains_key(&key))
    }

    async fn read(&self, key: &Path) -> Result<Vec<u8>> {
        let key = validate_key(key)?;
        self.delay().await;
        self.check(&self.failing_reads, &key).await?;
        self.log.write().await.push(Operation::Read(key.clone()));
        let (_modified, data) =
            self.storage.read().await.get(&key).cloned().ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key)))?;
        Ok(data)
    }

    async fn write(&self, key: &Path, data: &[u8]) -> Result<()> {
        let key = validate_key(key)?;
        self.delay().await;
        self.check(&self.failing_writes, &key).await?;
        self.storage.write().await.insert(key.clone(), (OffsetDateTime::now_utc(), data.to_vec()));
        self.log.write().await.push(Operation::Write(key));
        Ok(())
    }

    async fn delete(&self, key: &Path) -> Result<()> {
        let key = validate_key(key)?;
        self.delay().await;
        self.storage.write().await.remove(&key).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.clone())))?;
        self.log.write().await.push(Operation::Delete(key));
        Ok(())
    }

    async fn stat(&self, key: &Path) -> Result<ObjectInfo> {
        let key = validate_key(key)?;
        self.delay().await;
        let guard = self.storage.read().await;
        let (modified, data) = guard.get(&key).ok_or_else(|| exn::Exn::from(ErrorKind::NotFound(key.clone())))?;
        Ok(ObjectInfo::new(key.clone(), data.len() as u64, *modified))
    }
}
