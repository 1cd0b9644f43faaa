//! Batch updates end to end against the mock backend.

mod common;

use common::{REPO, backend, builder, coordinator, key, published, rpm, snapshot};
use rpmrepo_config::RepoConfig;
use rpmrepo_compress::Compression;
use rpmrepo_metadata::{MetadataKind, NamingPolicy, REPOMD_KEY, repomd};
use rpmrepo_rpm::fixtures::time_rpm;
use rpmrepo_rpm::models::Nevra;
use rpmrepo_rpm::{Digest, ParseOptions, parse_with};
use rpmrepo_storage::StorageBackend;
use rpmrepo_storage::backend::MockBackend;
use rpmrepo_update::error::ErrorKind;
use rpmrepo_update::{Batch, UpdateState};
use rstest::rstest;
use std::path::Path;
use std::sync::Arc;

fn nevra(s: &str) -> Nevra {
    s.parse().unwrap()
}

#[tokio::test]
async fn test_first_batch_publishes() {
    let backend = backend(&[("hello", "2.10"), ("time", "1.7")]);
    let coordinator = coordinator(&backend, RepoConfig::default());

    let batch = Batch::new().add(key("time", "1.7")).add(key("hello", "2.10"));
    let report = coordinator.batch_update(batch).await.unwrap();
    assert_eq!(report.packages, 2);
    assert_eq!(report.added, 2);
    assert_eq!(report.records.len(), 3);
    assert_eq!(coordinator.state(), UpdateState::Idle);

    let published = published(&backend).await.unwrap();
    assert_eq!(published.nevras(), ["hello-2.10-1.el7.x86_64", "time-1.7-1.el7.x86_64"]);
    assert_eq!(published.repomd.revision, report.revision);
    assert_eq!(published.repomd.records, report.records);
    for record in &published.repomd.records {
        assert!(record.location.starts_with("repodata/"));
        assert!(record.location.ends_with(&record.kind.file_name(rpmrepo_compress::Compression::Gzip)));
    }
}

#[rstest]
#[case::upload_key(false)]
#[case::content_addressed(true)]
#[tokio::test]
async fn test_time_package_into_empty_repository(#[case] content_addressed: bool) {
    let bytes = time_rpm();
    let upload = Path::new("x86_64/time-1.7-45.el7.x86_64.rpm");
    let backend = Arc::new(MockBackend::with_files([(upload, bytes.clone())]));
    let config = RepoConfig {
        content_addressed_packages: content_addressed,
        ..RepoConfig::default()
    };
    let coordinator = coordinator(&backend, config);
    coordinator.batch_update(Batch::new().add(upload)).await.unwrap();

    let index = backend.read(Path::new(REPOMD_KEY)).await.unwrap();
    assert_eq!(String::from_utf8(index).unwrap().matches("<data ").count(), 3);
    let published = published(&backend).await.unwrap();
    assert_eq!(published.nevras(), ["time-1.7-45.el7.x86_64"]);

    let primary = published.repomd.records.iter().find(|r| r.kind == MetadataKind::Primary).unwrap();
    let data = backend.read(Path::new(&primary.location)).await.unwrap();
    let xml = String::from_utf8(Compression::from_path(&primary.location).decompress(&data).unwrap()).unwrap();
    assert!(xml.contains(r#"packages="1""#));

    let [location] = published.locations()[..] else {
        panic!("expected one location");
    };
    assert_eq!(location == upload.to_string_lossy(), !content_addressed);
    assert_eq!(backend.read(Path::new(location)).await.unwrap(), bytes);
}

#[tokio::test]
async fn test_published_packages_match_their_rpms() {
    let bytes = builder("hello", "2.10")
        .epoch(2)
        .file("/etc/hello.conf", 0o100644, 0x01)
        .changelog(1_500_000_000, "Older <older@example.com> - 2.9-1", "- Older entry")
        .build();
    let backend = Arc::new(MockBackend::with_files([("x86_64/hello.rpm", bytes.clone())]));
    let coordinator = coordinator(&backend, RepoConfig::default());
    coordinator.batch_update(Batch::new().add("x86_64/hello.rpm")).await.unwrap();

    let published = published(&backend).await.unwrap();
    let [package] = published.packages.as_slice() else {
        panic!("expected one package, got {:?}", published.nevras());
    };
    let expected = parse_with(
        &bytes,
        &ParseOptions {
            location: "x86_64/hello.rpm".to_string(),
            digest: Digest::Sha256,
            file_time: package.time.file,
        },
    )
    .unwrap();
    assert_eq!(package.nevra, expected.nevra);
    assert_eq!(package.checksum, expected.checksum);
    assert_eq!(package.summary, expected.summary);
    assert_eq!(package.files, expected.files);
    assert_eq!(package.changelogs, expected.changelogs);
    assert_eq!(package.size, expected.size);
    assert_eq!(package.header_range, expected.header_range);
    assert_eq!(package.location, "x86_64/hello.rpm");
}

#[tokio::test]
async fn test_same_batch_twice_is_idempotent() {
    let backend = backend(&[("hello", "2.10"), ("time", "1.7")]);
    let coordinator = coordinator(&backend, RepoConfig::default());
    let batch = Batch::new().add(key("hello", "2.10")).add(key("time", "1.7"));

    let first = coordinator.batch_update(batch.clone()).await.unwrap();
    let second = coordinator.batch_update(batch).await.unwrap();
    assert_eq!(second.unchanged, 2);
    assert_eq!(second.added + second.replaced, 0);
    assert!(second.revision > first.revision);
    for (before, after) in first.records.iter().zip(&second.records) {
        assert_eq!(before.location, after.location);
        assert_eq!(before.checksum, after.checksum);
    }
}

#[tokio::test]
async fn test_replace_package() {
    let backend = backend(&[("hello", "2.10")]);
    let coordinator = coordinator(&backend, RepoConfig::default());
    coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();

    let rebuilt = builder("hello", "2.10").summary("Rebuilt").build();
    backend.write(Path::new("x86_64/hello-rebuilt.rpm"), &rebuilt).await.unwrap();
    let report = coordinator.batch_update(Batch::new().add("x86_64/hello-rebuilt.rpm")).await.unwrap();
    assert_eq!(report.replaced, 1);
    assert_eq!(report.packages, 1);

    let published = published(&backend).await.unwrap();
    assert_eq!(published.packages[0].summary, "Rebuilt");
    assert_eq!(published.locations(), ["x86_64/hello-rebuilt.rpm"]);
    // The replaced RPM stays in storage.
    assert!(backend.exists(&key("hello", "2.10")).await.unwrap());
}

#[tokio::test]
async fn test_last_package_in_batch_wins() {
    let backend = Arc::new(MockBackend::with_files([
        ("x86_64/a.rpm", builder("hello", "2.10").summary("first").build()),
        ("x86_64/b.rpm", builder("hello", "2.10").summary("second").build()),
    ]));
    let coordinator = coordinator(&backend, RepoConfig::default());
    let report = coordinator.batch_update(Batch::new().add("x86_64/a.rpm").add("x86_64/b.rpm")).await.unwrap();
    assert_eq!(report.packages, 1);

    let published = published(&backend).await.unwrap();
    assert_eq!(published.packages[0].summary, "second");
    assert_eq!(published.locations(), ["x86_64/b.rpm"]);
}

#[tokio::test]
async fn test_remove_package() {
    let backend = backend(&[("hello", "2.10"), ("time", "1.7")]);
    let coordinator = coordinator(&backend, RepoConfig::default());
    coordinator.batch_update(Batch::new().add(key("hello", "2.10")).add(key("time", "1.7"))).await.unwrap();

    let report = coordinator.batch_update(Batch::new().remove(nevra("time-1.7-1.el7.x86_64"))).await.unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(published(&backend).await.unwrap().nevras(), ["hello-2.10-1.el7.x86_64"]);
    // Removal unpublishes; it doesn't delete the RPM.
    assert!(backend.exists(&key("time", "1.7")).await.unwrap());

    let report = coordinator.batch_update(Batch::new().remove(nevra("absent-1-1.x86_64"))).await.unwrap();
    assert_eq!(report.removed, 0);
    assert_eq!(report.packages, 1);
}

#[tokio::test]
async fn test_add_and_remove_in_one_batch() {
    let backend = backend(&[("hello", "2.10"), ("hello", "2.11")]);
    let coordinator = coordinator(&backend, RepoConfig::default());
    coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();

    let batch = Batch::new().add(key("hello", "2.11")).remove(nevra("hello-2.10-1.el7.x86_64"));
    let report = coordinator.batch_update(batch).await.unwrap();
    assert_eq!((report.added, report.removed, report.packages), (1, 1, 1));
    assert_eq!(published(&backend).await.unwrap().nevras(), ["hello-2.11-1.el7.x86_64"]);
}

#[tokio::test]
async fn test_revision_is_monotonic() {
    let backend = backend(&[("hello", "2.10"), ("time", "1.7")]);
    let coordinator = coordinator(&backend, RepoConfig::default());
    let first = coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();

    // A previous writer with a clock far ahead.
    let ahead = first.revision + 86_400;
    let index = repomd::build(&first.records, ahead).unwrap();
    backend.write(Path::new(REPOMD_KEY), &index).await.unwrap();

    let second = coordinator.batch_update(Batch::new().add(key("time", "1.7"))).await.unwrap();
    assert_eq!(second.revision, ahead + 1);
    let third = coordinator.batch_update(Batch::new()).await.unwrap();
    assert_eq!(third.revision, ahead + 2);
}

#[tokio::test]
async fn test_malformed_package_aborts() {
    let backend = backend(&[("hello", "2.10")]);
    backend.write(Path::new("x86_64/broken.rpm"), b"\xed\xab\xee\xdb not really").await.unwrap();
    let coordinator = coordinator(&backend, RepoConfig::default());
    let before = snapshot(&backend).await;

    let batch = Batch::new().add(key("hello", "2.10")).add("x86_64/broken.rpm");
    let err = coordinator.batch_update(batch).await.unwrap_err();
    assert_eq!(*err, ErrorKind::MalformedPackage("x86_64/broken.rpm".to_string()));
    assert_eq!(coordinator.state(), UpdateState::Failed);
    assert_eq!(snapshot(&backend).await, before);
}

#[tokio::test]
async fn test_missing_package() {
    let backend = backend(&[]);
    let coordinator = coordinator(&backend, RepoConfig::default());
    let err = coordinator.batch_update(Batch::new().add("x86_64/absent.rpm")).await.unwrap_err();
    assert_eq!(*err, ErrorKind::PackageNotFound("x86_64/absent.rpm".to_string()));
    assert!(published(&backend).await.is_none());
}

#[rstest]
#[case::primary("primary.xml")]
#[case::filelists("filelists.xml")]
#[case::other("other.xml")]
#[case::index("repomd.xml")]
#[tokio::test]
async fn test_failed_write_keeps_previous_repository(#[case] failing: &'static str) {
    let backend = backend(&[("hello", "2.10"), ("time", "1.7")]);
    let coordinator = coordinator(&backend, RepoConfig::default());
    coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();
    let before = published(&backend).await.unwrap();

    backend.fail_writes_matching(move |key| key.to_string_lossy().contains(failing)).await;
    let err = coordinator.batch_update(Batch::new().add(key("time", "1.7"))).await.unwrap_err();
    assert_eq!(*err, ErrorKind::StorageUnavailable);
    assert!(err.is_retryable());
    assert_eq!(coordinator.state(), UpdateState::Failed);

    let after = published(&backend).await.unwrap();
    assert_eq!(after.repomd, before.repomd);
    assert_eq!(after.nevras(), ["hello-2.10-1.el7.x86_64"]);

    backend.clear_failures().await;
    coordinator.batch_update(Batch::new().add(key("time", "1.7"))).await.unwrap();
    assert_eq!(coordinator.state(), UpdateState::Idle);
    assert_eq!(published(&backend).await.unwrap().packages.len(), 2);
}

fn plain() -> RepoConfig {
    RepoConfig {
        naming: NamingPolicy::Plain,
        ..RepoConfig::default()
    }
}

#[rstest]
#[case::primary("primary.xml")]
#[case::filelists("filelists.xml")]
#[case::other("other.xml")]
#[case::index("repomd.xml")]
#[tokio::test]
async fn test_failed_write_keeps_previous_repository_with_plain_names(#[case] failing: &'static str) {
    let backend = backend(&[("hello", "2.10"), ("time", "1.7")]);
    let coordinator = coordinator(&backend, plain());
    coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();
    let before = published(&backend).await.unwrap();

    backend.fail_writes_matching(move |key| key.to_string_lossy().contains(failing)).await;
    let err = coordinator.batch_update(Batch::new().add(key("time", "1.7"))).await.unwrap_err();
    assert_eq!(*err, ErrorKind::StorageUnavailable);

    // The live files were never touched.
    let after = published(&backend).await.unwrap();
    assert_eq!(after.repomd, before.repomd);
    assert_eq!(after.nevras(), ["hello-2.10-1.el7.x86_64"]);

    backend.clear_failures().await;
    coordinator.batch_update(Batch::new().add(key("time", "1.7"))).await.unwrap();
    coordinator.rescan(None).await.unwrap();
    assert_eq!(published(&backend).await.unwrap().packages.len(), 2);
}

#[tokio::test]
async fn test_interrupted_plain_publish_is_finished_by_next_batch() {
    let backend = backend(&[("hello", "2.10"), ("time", "1.7")]);
    let coordinator = coordinator(&backend, plain());
    coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();

    // Staging succeeds; copying the staged filelists over the live one fails.
    backend.fail_writes_matching(|key| key == Path::new("repodata/filelists.xml.gz")).await;
    let err = coordinator.batch_update(Batch::new().add(key("time", "1.7"))).await.unwrap_err();
    assert_eq!(*err, ErrorKind::StorageUnavailable);
    assert_eq!(coordinator.state(), UpdateState::Failed);

    backend.clear_failures().await;
    let report = coordinator.batch_update(Batch::new()).await.unwrap();
    assert_eq!(report.packages, 2);
    let published = published(&backend).await.unwrap();
    assert_eq!(published.nevras(), ["hello-2.10-1.el7.x86_64", "time-1.7-1.el7.x86_64"]);
    let leftovers: Vec<_> =
        backend.keys().await.into_iter().filter(|key| key.starts_with("repodata/staging")).collect();
    assert!(leftovers.is_empty(), "{leftovers:?}");
}

#[tokio::test]
async fn test_corrupt_prior_metadata_fails_the_batch() {
    let backend = backend(&[("hello", "2.10"), ("time", "1.7")]);
    let coordinator = coordinator(&backend, RepoConfig::default());
    let report = coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();

    let primary = report.records.iter().find(|r| r.kind == MetadataKind::Primary).unwrap();
    backend.write(Path::new(&primary.location), b"not what was published").await.unwrap();
    let err = coordinator.batch_update(Batch::new().add(key("time", "1.7"))).await.unwrap_err();
    let ErrorKind::ChecksumMismatch { key, expected, .. } = &*err else {
        panic!("unexpected error: {err:?}");
    };
    assert_eq!(key, &primary.location);
    assert_eq!(expected, &primary.checksum.value);
}

#[tokio::test]
async fn test_missing_prior_metadata_fails_the_batch() {
    let backend = backend(&[("hello", "2.10")]);
    let coordinator = coordinator(&backend, RepoConfig::default());
    let report = coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();

    let other = report.records.iter().find(|r| r.kind == MetadataKind::Other).unwrap();
    backend.delete(Path::new(&other.location)).await.unwrap();
    let err = coordinator.batch_update(Batch::new()).await.unwrap_err();
    assert!(matches!(&*err, ErrorKind::InvalidMetadata(_)));
}

#[tokio::test]
async fn test_stale_metadata_is_removed() {
    let backend = backend(&[("hello", "2.10"), ("time", "1.7")]);
    let coordinator = coordinator(&backend, RepoConfig::default());
    coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();
    let report = coordinator.batch_update(Batch::new().add(key("time", "1.7"))).await.unwrap();

    let mut expected: Vec<String> = report.records.iter().map(|r| r.location.clone()).collect();
    expected.push(REPOMD_KEY.to_string());
    expected.sort();
    let stored: Vec<String> = backend
        .keys()
        .await
        .into_iter()
        .filter(|key| key.starts_with("repodata"))
        .map(|key| key.to_string_lossy().into_owned())
        .collect();
    assert_eq!(stored, expected);
}

#[tokio::test]
async fn test_without_filelists() {
    let backend = backend(&[("hello", "2.10")]);
    let config = RepoConfig {
        filelists: false,
        ..RepoConfig::default()
    };
    let coordinator = coordinator(&backend, config);
    let report = coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();
    let kinds: Vec<MetadataKind> = report.records.iter().map(|r| r.kind).collect();
    assert_eq!(kinds, [MetadataKind::Primary, MetadataKind::Other]);

    // Later batches still work without a filelists file to read back.
    coordinator.batch_update(Batch::new()).await.unwrap();
    let published = published(&backend).await.unwrap();
    assert_eq!(published.packages[0].files.len(), 1, "only primary files are known");
}

#[tokio::test]
async fn test_plain_naming() {
    let backend = backend(&[("hello", "2.10")]);
    let config = RepoConfig {
        naming: NamingPolicy::Plain,
        digest: Digest::Sha1,
        ..RepoConfig::default()
    };
    let coordinator = coordinator(&backend, config);
    let report = coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();
    let locations: Vec<&str> = report.records.iter().map(|r| r.location.as_str()).collect();
    assert_eq!(
        locations,
        ["repodata/primary.xml.gz", "repodata/filelists.xml.gz", "repodata/other.xml.gz"]
    );
    let published = published(&backend).await.unwrap();
    assert_eq!(published.packages[0].checksum.digest, Digest::Sha1);
}

#[tokio::test]
async fn test_content_addressed_packages() {
    let bytes = rpm("hello", "2.10");
    let backend = backend(&[("hello", "2.10")]);
    let config = RepoConfig {
        content_addressed_packages: true,
        ..RepoConfig::default()
    };
    let coordinator = coordinator(&backend, config);
    coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();

    let stored = format!("x86_64/{}-hello-2.10-1.el7.x86_64.rpm", Digest::Sha256.compute(&bytes));
    assert_eq!(published(&backend).await.unwrap().locations(), [stored.as_str()]);
    assert_eq!(backend.read(Path::new(&stored)).await.unwrap(), bytes);
    assert!(!backend.exists(&key("hello", "2.10")).await.unwrap());

    // Uploading the same bytes again is a no-op that cleans up the upload.
    backend.write(&key("hello", "2.10"), &bytes).await.unwrap();
    let report = coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();
    assert_eq!(report.unchanged, 1);
    assert!(!backend.exists(&key("hello", "2.10")).await.unwrap());
    assert!(backend.exists(Path::new(&stored)).await.unwrap());
}

#[tokio::test]
async fn test_identical_copy_elsewhere_is_left_alone() {
    let bytes = rpm("hello", "2.10");
    let backend = backend(&[("hello", "2.10")]);
    let coordinator = coordinator(&backend, RepoConfig::default());
    coordinator.batch_update(Batch::new().add(key("hello", "2.10"))).await.unwrap();

    let mirror = Path::new("mirror/hello-2.10-1.el7.x86_64.rpm");
    backend.write(mirror, &bytes).await.unwrap();
    let report = coordinator.batch_update(Batch::new().add(mirror)).await.unwrap();
    assert_eq!(report.unchanged, 1);
    assert_eq!(backend.read(mirror).await.unwrap(), bytes);
    assert_eq!(
        published(&backend).await.unwrap().locations(),
        [key("hello", "2.10").to_string_lossy()]
    );
}

#[tokio::test]
async fn test_rescan() {
    let backend = backend(&[("hello", "2.10"), ("time", "1.7")]);
    backend.write(Path::new("x86_64/README"), b"not a package").await.unwrap();
    let coordinator = coordinator(&backend, RepoConfig::default());

    let report = coordinator.rescan(None).await.unwrap();
    assert_eq!(report.added, 2);

    backend.delete(&key("time", "1.7")).await.unwrap();
    let report = coordinator.rescan(None).await.unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(published(&backend).await.unwrap().nevras(), ["hello-2.10-1.el7.x86_64"]);

    let report = coordinator.rescan(None).await.unwrap();
    assert_eq!((report.added, report.removed, report.packages), (0, 0, 1));
}

#[tokio::test]
async fn test_rescan_with_prefix() {
    let backend = backend(&[("hello", "2.10")]);
    backend.write(Path::new("noarch/data-1-1.el7.noarch.rpm"), &rpm("data", "1")).await.unwrap();
    let coordinator = coordinator(&backend, RepoConfig::default());
    coordinator.rescan(None).await.unwrap();

    // Packages outside the prefix are left alone even though nothing under
    // the prefix mentions them.
    backend.delete(&key("hello", "2.10")).await.unwrap();
    let report = coordinator.rescan(Some(Path::new("noarch"))).await.unwrap();
    assert_eq!((report.added, report.removed, report.packages), (0, 0, 2));
}

#[tokio::test]
async fn test_upload() {
    let backend = backend(&[]);
    let coordinator = coordinator(&backend, RepoConfig::default());
    let report = coordinator.upload(&key("hello", "2.10"), &rpm("hello", "2.10")).await.unwrap();
    assert_eq!(report.map(|r| r.added), Some(1));
    assert_eq!(published(&backend).await.unwrap().nevras(), ["hello-2.10-1.el7.x86_64"]);

    let err = coordinator.upload(Path::new("x86_64/notes.rpm"), b"plain text").await.unwrap_err();
    assert_eq!(*err, ErrorKind::MalformedPackage("x86_64/notes.rpm".to_string()));
    assert!(!backend.exists(Path::new("x86_64/notes.rpm")).await.unwrap());
}

#[tokio::test]
async fn test_upload_in_cron_mode_only_stores() {
    let backend = backend(&[]);
    let config = RepoConfig::from_yaml("update:\n  on:\n    cron: \"0 * * * *\"\n").unwrap();
    let coordinator = coordinator(&backend, config);
    let report = coordinator.upload(&key("hello", "2.10"), &rpm("hello", "2.10")).await.unwrap();
    assert!(report.is_none());
    assert!(backend.exists(&key("hello", "2.10")).await.unwrap());
    assert!(published(&backend).await.is_none());

    coordinator.rescan(None).await.unwrap();
    assert_eq!(published(&backend).await.unwrap().packages.len(), 1);
}

#[tokio::test]
async fn test_local_backend() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("x86_64")).unwrap();
    std::fs::write(dir.path().join("x86_64/hello.rpm"), rpm("hello", "2.10")).unwrap();
    let backend = rpmrepo_storage::backend::LocalBackend::new("local", dir.path()).unwrap();
    let coordinator =
        rpmrepo_update::UpdateCoordinator::new(REPO, Arc::new(backend), RepoConfig::default(), Default::default());

    let report = coordinator.rescan(None).await.unwrap();
    assert_eq!(report.added, 1);
    assert!(dir.path().join(REPOMD_KEY).is_file());
    for record in &report.records {
        let data = std::fs::read(dir.path().join(&record.location)).unwrap();
        assert!(record.matches(&data));
    }
}
