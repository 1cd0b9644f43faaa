//! yum/dnf repository metadata.
//!
//! A repository is described by three compressed XML documents and an index
//! that binds them together:
//!
//! ```text
//! repodata/repomd.xml              index: checksums, sizes, locations
//! repodata/<name>-primary.xml.gz   identity, dependencies, common files
//! repodata/<name>-filelists.xml.gz every file of every package
//! repodata/<name>-other.xml.gz     changelogs
//! ```
//!
//! [`MetadataWriter`] streams packages into one document at a time;
//! [`repomd::build`] writes the index over the finished documents. The
//! readers go the other way, rebuilding packages from what was published.

mod descriptor;
pub mod error;
mod kind;
mod naming;
mod reader;
pub mod repomd;
mod writer;

pub use crate::descriptor::{DataRecord, MetadataDescriptor};
pub use crate::kind::MetadataKind;
pub use crate::naming::NamingPolicy;
pub use crate::reader::{PackageChangelogs, PackageFiles, merge_prior, read_filelists, read_other, read_primary};
pub use crate::repomd::{REPOMD_KEY, Repomd, parse_repomd};
pub use crate::writer::{MetadataWriter, WriterContext, generate, is_primary_file};
