mod changelog;
mod dependency;
mod file;
mod nevra;
mod package;

pub use self::changelog::Changelog;
pub use self::dependency::{Dependency, DependencyKind, Flags, Relations};
pub use self::file::{FileEntry, FileType};
pub use self::nevra::Nevra;
pub use self::package::{Checksum, HeaderRange, Package, SignatureDigests, Sizes, Times};
