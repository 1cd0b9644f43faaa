//! Cron-driven rescans.

use crate::UpdateCoordinator;
use crate::error::ErrorKind;
use chrono::Utc;
use rpmrepo_config::{Schedule, UpdateMode};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Rescans a repository at every occurrence of its schedule.
///
/// Occurrences missed while a rescan was running are skipped, not queued.
pub struct Scheduler {
    coordinator: Arc<UpdateCoordinator>,
    schedule: Schedule,
}

impl Scheduler {
    pub fn new(coordinator: Arc<UpdateCoordinator>, schedule: Schedule) -> Self {
        Self { coordinator, schedule }
    }

    /// The scheduler the coordinator's configuration asks for, if any.
    pub fn for_coordinator(coordinator: Arc<UpdateCoordinator>) -> Option<Self> {
        match &coordinator.config().mode {
            UpdateMode::Cron(schedule) => {
                let schedule = schedule.clone();
                Some(Self::new(coordinator, schedule))
            },
            UpdateMode::Upload => None,
        }
    }

    /// Run until `token` is cancelled or the schedule has no further
    /// occurrences. Returns how many rescans were started.
    #[instrument(skip_all, fields(repo = %self.coordinator.repo(), schedule = %self.schedule))]
    pub async fn run(&self, token: CancellationToken) -> usize {
        let mut runs = 0;
        let mut last = Utc::now();
        loop {
            let Some(next) = self.schedule.next_after(&last.max(Utc::now())) else {
                tracing::info!("schedule has no further occurrences");
                break;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or_default();
            tracing::debug!(%next, "waiting for next rescan");
            tokio::select! {
                biased;
                () = token.cancelled() => break,
                () = tokio::time::sleep(wait) => {},
            }
            last = next;
            runs += 1;
            match self.coordinator.rescan_cancellable(None, &token).await {
                Ok(report) => {
                    tracing::info!(revision = report.revision, packages = report.packages, "scheduled rescan")
                }
                Err(err) if *err == ErrorKind::Cancelled => break,
                Err(err) => tracing::warn!(error = ?err, "scheduled rescan failed"),
            }
        }
        runs
    }
}
