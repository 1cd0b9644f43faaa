//! Local filesystem storage backend.
//!
//! Keys map onto files below a root directory, accessed through `tokio::fs`.
//! This is what the CLI uses to update a repository directory in place.

use crate::backend::ObjectInfoStream;
use crate::error::ErrorKind;
use crate::{ObjectInfo, StorageBackend, error::Result, key::validate as validate_key};
use async_stream::stream;
use async_trait::async_trait;
use exn::ResultExt;
use std::fs::{Metadata, create_dir_all as sync_create_dir};
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};
use tokio::io::AsyncWriteExt;

enum WalkEntry {
    File(ObjectInfo),
    Descend(PathBuf),
    Skip,
}

/// Local filesystem storage backend.
///
/// # Examples
///
/// ```no_run
/// use rpmrepo_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("local", "/srv/repos/centos-7")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Root directory of the repository
    root: PathBuf,
}
impl LocalBackend {
    /// Create a new local filesystem backend rooted at an absolute path.
    ///
    /// The root directory is created if it doesn't exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidKey`](ErrorKind::InvalidKey) if the path is relative
    /// or points at something that isn't a directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidKey(root));
        }
        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidKey(root));
            }
        } else {
            // Non-async on purpose: runs once at startup and keeps the
            // constructor synchronous.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root))?;
        }
        Ok(Self { name: name.into(), root })
    }

    fn absolute_path(&self, key: impl AsRef<Path>) -> Result<PathBuf> {
        let validated = validate_key(key.as_ref())?;
        Ok(self.root.join(validated))
    }

    fn relative_key(&self, absolute: impl AsRef<Path>) -> Result<PathBuf> {
        let absolute = absolute.as_ref();
        let relative = absolute.strip_prefix(&self.root).or_raise(|| {
            ErrorKind::BackendError(format!("path `{:?}` is not within root `{:?}`", absolute, self.root))
        })?;
        validate_key(relative)
    }

    fn object_info(key: &Path, metadata: Metadata) -> Result<ObjectInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?.into();
        Ok(ObjectInfo::new(key, metadata.len(), modified))
    }

    fn map_io_error(e: std::io::Error, key: &Path) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(key.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(key.to_path_buf()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Pulled out of the listing stream so errors can use `?`; inside
    /// `stream!` every error has to be yielded by hand.
    async fn process_entry(&self, entry: DirEntry, prefix: Option<&Path>) -> Result<WalkEntry> {
        let path = entry.path();
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &path))?;
        let relative = self.relative_key(&path)?;
        if metadata.is_dir() {
            // Only descend into directories that can still contain a match.
            return match prefix {
                Some(pfx) if !relative.starts_with(pfx) && !pfx.starts_with(&relative) => Ok(WalkEntry::Skip),
                _ => Ok(WalkEntry::Descend(path)),
            };
        }
        if let Some(pfx) = prefix
            && !relative.starts_with(pfx)
        {
            return Ok(WalkEntry::Skip);
        }
        if metadata.is_file() {
            // In-flight temporary files from `write()` are never listed.
            if relative.extension().is_some_and(|ext| ext == "partial") {
                return Ok(WalkEntry::Skip);
            }
            return Ok(WalkEntry::File(Self::object_info(&relative, metadata)?));
        }
        // Most likely a broken symlink.
        Ok(WalkEntry::Skip)
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a Path>) -> ObjectInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_key).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Result::Err(e) })),
        };
        let mut stack = vec![self.root.clone()];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    // Listing a directory that doesn't exist is an empty
                    // listing, the same as an object store would answer.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &current)));
                        continue 'dirs;
                    }
                };
                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => { yield Err(exn::Exn::from(Self::map_io_error(e, &current))); continue 'entries; },
                    };
                    match self.process_entry(entry, validated_prefix.as_deref()).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }

    async fn exists(&self, key: &Path) -> Result<bool> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::try_exists(&abs_path).await.map_err(ErrorKind::Io)?)
    }

    async fn read(&self, key: &Path) -> Result<Vec<u8>> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::read(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?)
    }

    async fn write(&self, key: &Path, data: &[u8]) -> Result<()> {
        let abs_path = self.absolute_path(key)?;
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, key))?;
        }
        // Write to a sibling, sync, then rename over the target: a reader
        // never observes a half-written repomd.xml.
        let mut partial = abs_path.clone().into_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        let mut file = fs::File::create(&partial).await.map_err(|e| Self::map_io_error(e, key))?;
        file.write_all(data).await.map_err(ErrorKind::Io)?;
        file.sync_all().await.map_err(ErrorKind::Io)?;
        drop(file);
        Ok(fs::rename(&partial, &abs_path).await.map_err(|e| Self::map_io_error(e, key))?)
    }

    async fn delete(&self, key: &Path) -> Result<()> {
        let abs_path = self.absolute_path(key)?;
        Ok(fs::remove_file(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?)
    }

    async fn stat(&self, key: &Path) -> Result<ObjectInfo> {
        let abs_path = self.absolute_path(key)?;
        let metadata = fs::metadata(&abs_path).await.map_err(|e| Self::map_io_error(e, key))?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::NotFound(key.to_path_buf()));
        }
        Self::object_info(&validate_key(key)?, metadata)
    }
}
