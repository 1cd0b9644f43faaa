//! Batch updates of RPM repository metadata.
//!
//! An [`UpdateCoordinator`] owns one repository. Each batch reads the
//! published `repomd.xml` and the files it references, folds in the added
//! and removed packages, regenerates `primary`, `filelists` and `other`,
//! then publishes them by writing `repomd.xml` last:
//!
//! ```text
//! lease → load prior → parse RPMs → merge → generate → write data files
//!       → verify → write repomd.xml → clean up
//! ```
//!
//! Readers see either the previous `repomd.xml` or the new one, and every
//! file either one references exists. That holds when metadata files get
//! content-derived names (the default `naming-policy`). With `plain` names
//! the data files are staged first and copied over the live ones right
//! before `repomd.xml`, so a reader can briefly see new data under old
//! checksums. A batch interrupted during that copy is finished by the next
//! one.

mod batch;
mod commit;
mod coordinator;
pub mod error;
mod lease;
mod merge;
mod prior;
mod scan;
mod scheduler;
mod staging;
mod store;

pub use crate::batch::{Batch, UpdateReport};
pub use crate::coordinator::{UpdateCoordinator, UpdateState};
pub use crate::lease::{Lease, LeaseRegistry};
pub use crate::scheduler::Scheduler;
