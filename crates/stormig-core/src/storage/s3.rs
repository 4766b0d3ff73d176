use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;

use super::StorageEngine;
use crate::error::{MigrateError, Result};

/// S3-backed storage engine. Each file is stored at `<prefix><name>`.
///
/// Enable with the `s3` Cargo feature flag.
pub struct S3Storage {
    client: S3Client,
    bucket: String,
    prefix: String,
}

impl S3Storage {
    /// Create a new S3Storage.
    ///
    /// `bucket` – the S3 bucket name.
    /// `prefix` – optional key prefix (e.g. `"media/"`) – use `""` for none.
    ///
    /// AWS credentials / region are resolved via the standard SDK chain
    /// (env vars, `~/.aws/credentials`, instance profile, etc.).
    pub async fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Result<Self> {
        let config = aws_config::load_from_env().await;
        let client = S3Client::new(&config);
        let storage = S3Storage {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        };
        storage.check_bucket().await?;
        Ok(storage)
    }

    fn key(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Verify bucket access with a cheap `head_bucket` call.
    async fn check_bucket(&self) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                MigrateError::Storage(format!(
                    "S3 bucket '{}' not accessible: {}",
                    self.bucket,
                    e.into_service_error()
                ))
            })?;
        Ok(())
    }
}

#[async_trait]
impl StorageEngine for S3Storage {
    async fn exists(&self, name: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(self.key(name))
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_err = e.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(MigrateError::Storage(service_err.to_string()))
                }
            }
        }
    }

    async fn open(&self, name: &str) -> Result<Vec<u8>> {
        match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.key(name))
            .send()
            .await
        {
            Ok(resp) => {
                let bytes = resp
                    .body
                    .collect()
                    .await
                    .map_err(|e| MigrateError::Storage(e.to_string()))?
                    .into_bytes()
                    .to_vec();
                Ok(bytes)
            }
            Err(e) => {
                // The SDK wraps NoSuchKey inside SdkError; check the service error.
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    Err(MigrateError::FileNotFound {
                        name: name.to_string(),
                    })
                } else {
                    Err(MigrateError::Storage(service_err.to_string()))
                }
            }
        }
    }

    async fn save(&self, name: &str, data: Vec<u8>) -> Result<String> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(self.key(name))
            .body(aws_sdk_s3::primitives::ByteStream::from(data))
            .content_type("application/octet-stream")
            .send()
            .await
            .map_err(|e| MigrateError::Storage(e.into_service_error().to_string()))?;
        Ok(name.to_string())
    }
}
