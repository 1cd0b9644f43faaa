//! Storage key validation and helpers.
//!
//! Keys are relative, path-like strings (`x86_64/time-1.7-45.el7.x86_64.rpm`,
//! `repodata/repomd.xml`). Backends are free to map them onto directories or
//! object names, but every key must stay inside the storage root.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates and normalizes a storage key.
///
/// Resolves `.` and `..` components without ever leaving the storage root,
/// strips leading/trailing/duplicate separators and rejects null bytes.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use rpmrepo_storage::validate_key;
/// assert!(validate_key("x86_64/time-1.7-45.el7.x86_64.rpm").is_ok());
/// assert!(validate_key("/repodata/repomd.xml").is_ok());
/// assert!(validate_key("../etc/passwd").is_err());
/// assert!(validate_key("a\0b").is_err());
/// assert_eq!(
///     validate_key("x86_64/../repodata//./repomd.xml").unwrap(),
///     Path::new("repodata/repomd.xml")
/// );
/// ```
pub fn validate(key: impl AsRef<Path>) -> Result<PathBuf> {
    let key = key.as_ref();
    let mut components = Vec::new();
    for component in key.components() {
        match component {
            Component::Normal(s) => {
                // Null bytes survive Path::components() on Unix but truncate
                // keys in anything C-based underneath a backend.
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(ErrorKind::InvalidKey(key.to_path_buf()));
                }
                components.push(s)
            },
            // Leading slashes are tolerated: uploaders commonly send
            // `/repo/pkg.rpm` and mean "relative to the repository".
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(ErrorKind::InvalidKey(key.to_path_buf())),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidKey(key.to_path_buf()));
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(ErrorKind::InvalidKey(key.to_path_buf())),
        false => Ok(components.into_iter().collect()),
    }
}

/// Join a relative key onto a prefix and validate the result.
///
/// An empty prefix yields the key itself.
pub fn join(prefix: impl AsRef<Path>, key: impl AsRef<Path>) -> Result<PathBuf> {
    let prefix = prefix.as_ref();
    if prefix.as_os_str().is_empty() {
        return validate(key);
    }
    validate(prefix.join(key.as_ref().strip_prefix("/").unwrap_or(key.as_ref())))
}

/// Last component of a key as a UTF-8 string, if any.
pub fn file_name(key: impl AsRef<Path>) -> Option<String> {
    key.as_ref().file_name().and_then(|n| n.to_str()).map(str::to_string)
}
