//! Compression of `repodata/*.xml` files.
//!
//! Clients cache metadata by checksum, so every [`Encoder`] here is
//! deterministic: the same XML always compresses to the same bytes. Gzip
//! headers carry no timestamp or file name, and no format runs
//! multithreaded.
//!
//! The format of a previously published file is recovered from its stored
//! name with [`Compression::from_path`]; `repomd.xml` itself is never
//! compressed.
//!
//! Gzip (what every `yum`/`dnf` client reads) and Bzip2 are always built.
//! XZ and Zstd sit behind the `xz` and `zstd` features.

mod construct;
mod encoder;
pub mod error;
mod ops;
mod util;

pub use crate::encoder::Encoder;

/// Compression applied to a generated metadata file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    None,
    Bzip2,
    #[default]
    Gzip,
    #[cfg(feature = "xz")]
    Xz,
    #[cfg(feature = "zstd")]
    Zstd,
}
