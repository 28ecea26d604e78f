//! End-to-end tests for the catalog service
//!
//! These tests drive the full upload/list/download/delete flow against real
//! blob and ledger storage in a temporary directory, without the HTTP layer.

use depot::{
    BlobStore, CatalogError, CatalogService, CatalogStore, FilePart, Submission, UploadPolicy,
    ValidationError,
};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

/// Helper to create a service backed by a temporary storage directory
async fn create_service(require_image: bool) -> (Arc<CatalogService>, Arc<BlobStore>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let blobs = Arc::new(BlobStore::new(temp_dir.path().join("blobs")).await.unwrap());
    let catalog = Arc::new(CatalogStore::open(temp_dir.path().join("catalog.sled")).unwrap());
    let service = Arc::new(CatalogService::new(
        blobs.clone(),
        catalog,
        UploadPolicy { require_image },
    ));
    (service, blobs, temp_dir)
}

fn submission(
    name: &str,
    description: &str,
    artifact: Option<(&str, &[u8])>,
    image: Option<(&str, &[u8])>,
) -> Submission {
    Submission {
        name: name.to_string(),
        description: description.to_string(),
        artifact: artifact.map(|(filename, bytes)| FilePart::new(filename, bytes.to_vec())),
        image: image.map(|(filename, bytes)| FilePart::new(filename, bytes.to_vec())),
    }
}

/// The concrete happy-path scenario: publish, enumerate, download both
/// blobs byte-exact, then delete and observe everything gone.
#[tokio::test]
async fn publish_download_delete_round_trip() {
    let (service, blobs, _temp) = create_service(false).await;

    let artifact_bytes = b"0123456789"; // 10 bytes
    let image_bytes = b"12345"; // 5 bytes

    let entry = service
        .submit(submission(
            "Demo",
            "d",
            Some(("app.apk", artifact_bytes)),
            Some(("icon.png", image_bytes)),
        ))
        .await
        .unwrap();

    assert_eq!(entry.name, "Demo");
    assert_eq!(entry.description, "d");
    assert_eq!(entry.artifact_filename, "app.apk");
    assert_eq!(entry.artifact_size, 10);
    assert_eq!(
        entry.artifact_checksum,
        BlobStore::compute_checksum(artifact_bytes)
    );
    let image_ref = entry.image_ref.clone().unwrap();
    assert_ne!(entry.artifact_ref, image_ref);

    let listed = service.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0], entry);

    let (_, downloaded) = service.open_artifact(entry.id).await.unwrap();
    assert_eq!(downloaded, artifact_bytes);
    let (_, preview) = service.open_image(entry.id).await.unwrap();
    assert_eq!(preview, image_bytes);

    service.remove(entry.id).await.unwrap();

    assert!(matches!(
        service.get(entry.id),
        Err(CatalogError::EntryNotFound(_))
    ));
    assert!(!blobs.exists(&entry.artifact_ref).await);
    assert!(!blobs.exists(&image_ref).await);
    assert!(service.list().unwrap().is_empty());
}

/// A rejected submission must leave both stores untouched.
#[tokio::test]
async fn rejected_submission_has_no_side_effects() {
    let (service, blobs, _temp) = create_service(false).await;

    let err = service
        .submit(submission("Demo", "", Some(("app.apk", b"bytes")), None))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Validation(ValidationError::MissingDescription)
    ));

    assert!(service.list().unwrap().is_empty());
    let stats = blobs.stats().await.unwrap();
    assert_eq!(stats.total_blobs, 0);
    assert_eq!(stats.total_bytes, 0);
}

/// Rejections name the offending filename so clients can fix the right file.
#[tokio::test]
async fn disallowed_extension_is_named_in_the_rejection() {
    let (service, _blobs, _temp) = create_service(false).await;

    let err = service
        .submit(submission("Demo", "d", Some(("app.txt", b"bytes")), None))
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("app.txt"), "message: {message}");
    assert!(message.contains("apk"), "message: {message}");
}

#[tokio::test]
async fn missing_artifact_is_rejected() {
    let (service, _blobs, _temp) = create_service(false).await;

    let err = service
        .submit(submission("Demo", "d", None, None))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Validation(ValidationError::MissingArtifact)
    ));
}

/// Deleting twice: the first call succeeds, the second reports not-found,
/// and the blobs are gone after the first.
#[tokio::test]
async fn delete_is_idempotent() {
    let (service, blobs, _temp) = create_service(false).await;

    let entry = service
        .submit(submission("Demo", "d", Some(("app.zip", b"content")), None))
        .await
        .unwrap();

    service.remove(entry.id).await.unwrap();
    assert!(!blobs.exists(&entry.artifact_ref).await);

    let err = service.remove(entry.id).await.unwrap_err();
    assert!(matches!(err, CatalogError::EntryNotFound(id) if id == entry.id));
}

/// The preview image is optional by default and mandatory under policy.
#[tokio::test]
async fn image_policy_is_configurable() {
    let (optional, _blobs, _temp) = create_service(false).await;
    let entry = optional
        .submit(submission("Demo", "d", Some(("app.apk", b"bytes")), None))
        .await
        .unwrap();
    assert!(entry.image_ref.is_none());
    assert!(matches!(
        optional.open_image(entry.id).await.unwrap_err(),
        CatalogError::NoImage(_)
    ));

    let (strict, _blobs2, _temp2) = create_service(true).await;
    let err = strict
        .submit(submission("Demo", "d", Some(("app.apk", b"bytes")), None))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::Validation(ValidationError::MissingImage)
    ));
}

/// Concurrent submissions must end up with distinct ids and storage names,
/// and the catalog must contain exactly all of them.
#[tokio::test]
async fn concurrent_submissions_stay_distinct() {
    let (service, _blobs, _temp) = create_service(false).await;

    const N: usize = 8;
    let handles: Vec<_> = (0..N)
        .map(|i| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .submit(submission(
                        &format!("App {i}"),
                        "concurrent upload",
                        Some(("app.apk", format!("payload-{i}").as_bytes())),
                        None,
                    ))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let entries: Vec<_> = futures_util::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let ids: HashSet<u64> = entries.iter().map(|e| e.id).collect();
    let refs: HashSet<&str> = entries.iter().map(|e| e.artifact_ref.as_str()).collect();
    assert_eq!(ids.len(), N);
    assert_eq!(refs.len(), N);

    let listed = service.list().unwrap();
    assert_eq!(listed.len(), N);
    let listed_ids: HashSet<u64> = listed.iter().map(|e| e.id).collect();
    assert_eq!(listed_ids, ids);
}

/// A record whose blob disappeared out-of-band (pre-existing corruption) is
/// served as a degraded not-found, not a crash or an IO error.
#[tokio::test]
async fn missing_blob_reads_as_degraded_not_found() {
    let (service, blobs, _temp) = create_service(false).await;

    let entry = service
        .submit(submission("Demo", "d", Some(("app.apk", b"bytes")), None))
        .await
        .unwrap();

    // Remove the blob behind the catalog's back.
    assert!(blobs.delete(&entry.artifact_ref).await.unwrap());

    let err = service.open_artifact(entry.id).await.unwrap_err();
    assert!(matches!(
        err,
        CatalogError::MissingBlob { id, .. } if id == entry.id
    ));
    // The record itself is still readable.
    assert_eq!(service.get(entry.id).unwrap().id, entry.id);
}

/// Entries and blobs survive a full close-and-reopen of the stores.
#[tokio::test]
async fn catalog_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let ledger_path = temp_dir.path().join("catalog.sled");
    let blobs_path = temp_dir.path().join("blobs");

    let published = {
        let blobs = Arc::new(BlobStore::new(&blobs_path).await.unwrap());
        let catalog = Arc::new(CatalogStore::open(&ledger_path).unwrap());
        let service = CatalogService::new(blobs, catalog, UploadPolicy::default());
        service
            .submit(submission(
                "Durable",
                "survives restart",
                Some(("tool.exe", b"binary bits")),
                None,
            ))
            .await
            .unwrap()
    };

    let catalog = CatalogStore::open(&ledger_path).unwrap();
    let reloaded = catalog.get(published.id).unwrap().unwrap();
    assert_eq!(reloaded, published);

    let blobs = BlobStore::new(&blobs_path).await.unwrap();
    let bytes = blobs.get(&published.artifact_ref).await.unwrap();
    assert_eq!(bytes, b"binary bits");
}
