//! S3 engine tests.
//!
//! Requires S3 or LocalStack and a bucket named `stormig-test`.
//!
//! Run: `cargo test --features s3 -- --ignored s3`

#![cfg(feature = "s3")]

use stormig_core::storage::S3Storage;
use stormig_core::StorageEngine;

const TEST_BUCKET: &str = "stormig-test";

#[tokio::test]
#[ignore] // Requires S3/LocalStack
async fn test_s3_save_open_exists() {
    let prefix = format!("test-{}/", uuid::Uuid::new_v4());
    let storage = S3Storage::new(TEST_BUCKET, prefix)
        .await
        .expect("Failed to create S3 storage");

    assert!(!storage.exists("docs/report.pdf").await.unwrap());
    storage
        .save("docs/report.pdf", b"pdf".to_vec())
        .await
        .unwrap();
    assert!(storage.exists("docs/report.pdf").await.unwrap());
    assert_eq!(storage.open("docs/report.pdf").await.unwrap(), b"pdf");
}

#[tokio::test]
#[ignore] // Requires S3/LocalStack
async fn test_s3_open_missing_is_not_found() {
    let prefix = format!("test-{}/", uuid::Uuid::new_v4());
    let storage = S3Storage::new(TEST_BUCKET, prefix).await.unwrap();
    let err = storage.open("nope.bin").await.unwrap_err();
    assert!(matches!(err, stormig_core::MigrateError::FileNotFound { .. }));
}
