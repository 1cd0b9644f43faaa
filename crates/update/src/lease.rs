//! Per-repository exclusive leases.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out at most one [`Lease`] per repository at a time.
///
/// Cloning shares the registry. Waiters are served in FIFO order.
#[derive(Debug, Clone, Default)]
pub struct LeaseRegistry {
    leases: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

/// Exclusive right to update one repository. Released on drop.
#[derive(Debug)]
pub struct Lease {
    repo: String,
    _guard: OwnedMutexGuard<()>,
}

impl Lease {
    pub fn repo(&self) -> &str {
        &self.repo
    }
}

impl LeaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, repo: &str) -> Arc<AsyncMutex<()>> {
        // The map is only touched briefly and never across an await.
        let mut leases = self.leases.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(leases.entry(repo.to_string()).or_default())
    }

    /// Wait for the repository to be free.
    pub async fn acquire(&self, repo: &str) -> Lease {
        let guard = self.slot(repo).lock_owned().await;
        tracing::trace!(repo, "lease acquired");
        Lease {
            repo: repo.to_string(),
            _guard: guard,
        }
    }

    /// Take the lease only if nobody holds it.
    pub fn try_acquire(&self, repo: &str) -> Option<Lease> {
        let guard = self.slot(repo).try_lock_owned().ok()?;
        Some(Lease {
            repo: repo.to_string(),
            _guard: guard,
        })
    }
}
