//! Per-repository settings.
//!
//! Settings are layered: built-in defaults, then a settings file (YAML, or
//! TOML/JSON by extension), then `RPMREPO_` environment variables. Nested
//! keys are separated by `__` in the environment and `_` stands for `-`:
//!
//! ```yaml
//! digest: sha256              # RPMREPO_DIGEST
//! naming-policy: sha256       # RPMREPO_NAMING_POLICY
//! filelists: true
//! update:
//!   on:
//!     cron: "0 * * * *"       # RPMREPO_UPDATE__ON__CRON
//! ```

pub mod error;
mod repo;
mod schedule;

pub use crate::repo::{ConflictPolicy, RepoConfig, UpdateMode};
pub use crate::schedule::Schedule;
