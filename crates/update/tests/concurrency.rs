//! Leases, cancellation and timeouts.

mod common;

use common::{REPO, backend, coordinator, key, published, rpm, snapshot};
use rpmrepo_config::{ConflictPolicy, RepoConfig};
use rpmrepo_storage::backend::MockBackend;
use rpmrepo_update::error::ErrorKind;
use rpmrepo_update::{Batch, LeaseRegistry, UpdateCoordinator, UpdateState};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn fail_fast() -> RepoConfig {
    RepoConfig {
        on_conflict: ConflictPolicy::Fail,
        ..RepoConfig::default()
    }
}

#[tokio::test]
async fn test_fail_fast_while_leased() {
    let backend = backend(&[("hello", "2.10")]);
    let leases = LeaseRegistry::new();
    let coordinator = UpdateCoordinator::new(REPO, backend.clone(), fail_fast(), leases.clone());

    let lease = leases.acquire(REPO).await;
    let err = coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap_err();
    assert_eq!(*err, ErrorKind::UpdateInProgress(REPO.to_string()));
    assert!(err.is_retryable());
    // Losing the race is not a failure of the repository.
    assert_eq!(coordinator.state(), UpdateState::Idle);
    assert!(published(&backend).await.is_none());

    drop(lease);
    coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();
}

#[tokio::test]
async fn test_other_repositories_are_not_blocked() {
    let backend = backend(&[("hello", "2.10")]);
    let leases = LeaseRegistry::new();
    let coordinator = UpdateCoordinator::new(REPO, backend.clone(), fail_fast(), leases.clone());

    let _other = leases.acquire("el8-x86_64").await;
    coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();
}

#[tokio::test]
async fn test_waiting_batch_runs_after_lease_release() {
    let backend = backend(&[("hello", "2.10")]);
    let leases = LeaseRegistry::new();
    let coordinator =
        Arc::new(UpdateCoordinator::new(REPO, backend.clone(), RepoConfig::default(), leases.clone()));

    let lease = leases.acquire(REPO).await;
    let task = tokio::spawn({
        let coordinator = Arc::clone(&coordinator);
        async move { coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await }
    });
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert!(!task.is_finished());
    assert!(backend.operations().await.is_empty(), "a queued batch must not touch storage");

    drop(lease);
    let report = task.await.unwrap().unwrap();
    assert_eq!(report.added, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_batches_are_serialized() {
    let names = ["alpha", "bravo", "charlie", "delta", "echo", "foxtrot"];
    let backend = Arc::new(MockBackend::with_files(names.map(|name| (key(name, "1"), rpm(name, "1")))));
    let leases = LeaseRegistry::new();

    let tasks: Vec<_> = names
        .into_iter()
        .map(|name| {
            // Separate coordinators share only the registry, as separate
            // request handlers would.
            let coordinator = UpdateCoordinator::new(REPO, backend.clone(), RepoConfig::default(), leases.clone());
            tokio::spawn(async move { coordinator.batch_update(Batch::new().add(key(name, "1"))).await })
        })
        .collect();
    let mut revisions = Vec::new();
    for task in tasks {
        revisions.push(task.await.unwrap().unwrap().revision);
    }
    revisions.sort_unstable();
    revisions.dedup();
    assert_eq!(revisions.len(), names.len(), "every batch publishes its own revision");
    assert_eq!(published(&backend).await.unwrap().packages.len(), names.len());
}

#[tokio::test]
async fn test_cancelled_batch_leaves_storage_untouched() {
    let backend = backend(&[("hello", "2.10")]);
    let coordinator = coordinator(&backend, RepoConfig::default());
    let before = snapshot(&backend).await;

    let token = CancellationToken::new();
    token.cancel();
    let err = coordinator
        .batch_update_cancellable(Batch::new().add(key("hello", "2.10")), &token)
        .await
        .unwrap_err();
    assert_eq!(*err, ErrorKind::Cancelled);
    // Cancelled while waiting for the lease, so the batch never started.
    assert_eq!(coordinator.state(), UpdateState::Idle);
    assert_eq!(snapshot(&backend).await, before);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_batch() {
    let backend = Arc::new(
        MockBackend::with_files([(key("hello", "2.10"), rpm("hello", "2.10"))]).with_latency(Duration::from_secs(1)),
    );
    let coordinator = Arc::new(coordinator(&backend, RepoConfig::default()));
    let token = CancellationToken::new();
    let task = tokio::spawn({
        let coordinator = Arc::clone(&coordinator);
        let token = token.clone();
        async move {
            coordinator
                .batch_update_cancellable(Batch::new().add(key("hello", "2.10")), &token)
                .await
        }
    });

    // Past the journal and index reads, while the package is being read.
    tokio::time::sleep(Duration::from_millis(2500)).await;
    token.cancel();
    let err = task.await.unwrap().unwrap_err();
    assert_eq!(*err, ErrorKind::Cancelled);
    assert!(backend.writes().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_storage_timeout() {
    let backend = Arc::new(
        MockBackend::with_files([(key("hello", "2.10"), rpm("hello", "2.10"))]).with_latency(Duration::from_secs(60)),
    );
    let config = RepoConfig {
        storage_timeout: Duration::from_secs(5),
        ..RepoConfig::default()
    };
    let coordinator = coordinator(&backend, config);
    let err = coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap_err();
    assert_eq!(*err, ErrorKind::StorageUnavailable);
    assert_eq!(coordinator.state(), UpdateState::Failed);
}

#[tokio::test]
async fn test_state_transitions() {
    let backend = backend(&[("hello", "2.10")]);
    let coordinator = coordinator(&backend, RepoConfig::default());
    let mut states = coordinator.subscribe();
    assert_eq!(*states.borrow_and_update(), UpdateState::Idle);

    coordinator.batch_update(Batch::new().add("x86_64/absent.rpm")).await.unwrap_err();
    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), UpdateState::Failed);

    coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();
    assert_eq!(*states.borrow_and_update(), UpdateState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_abandoned_batch_is_failed() {
    let backend = Arc::new(
        MockBackend::with_files([(key("hello", "2.10"), rpm("hello", "2.10"))]).with_latency(Duration::from_secs(1)),
    );
    let coordinator = coordinator(&backend, RepoConfig::default());
    let batch = coordinator.batch_update(Batch::new().add(key("hello", "2.10")));
    tokio::time::timeout(Duration::from_millis(1500), batch).await.unwrap_err();
    assert_eq!(coordinator.state(), UpdateState::Failed);

    // The lease went with the dropped future.
    coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();
    assert_eq!(coordinator.state(), UpdateState::Idle);
}
