// mysqltool/src/storage/s3.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::primitives::ByteStream;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::ObjectStore;
use crate::config::StorageSettings;

/// S3 (or S3-compatible, e.g. DigitalOcean Spaces) backed object store.
pub struct S3Store {
    client: s3::Client,
}

impl S3Store {
    /// Builds a client from static credentials. No request is made here.
    pub async fn connect(settings: &StorageSettings) -> Self {
        let mut loader = aws_config::defaults(s3::config::BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(s3::config::Credentials::new(
                &settings.access_key_id,
                &settings.secret_access_key,
                None,     // session_token
                None,     // expiry
                "Static", // provider_name
            ));
        if let Some(endpoint) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        let s3_config = s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.force_path_style)
            .build();

        tracing::debug!(
            region = %settings.region,
            endpoint = ?settings.endpoint_url,
            "object storage client configured"
        );
        S3Store {
            client: s3::Client::from_conf(s3_config),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_file(&self, bucket: &str, key: &str, file_path: &Path) -> Result<()> {
        let body = ByteStream::from_path(file_path)
            .await
            .with_context(|| format!("Failed to create ByteStream from file: {}", file_path.display()))?;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to upload file {} to S3 bucket {} with key {}",
                    file_path.display(),
                    bucket,
                    key
                )
            })?;
        tracing::debug!(bucket, key, "uploaded object");
        Ok(())
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) => match err.as_service_error() {
                Some(service_err) if service_err.is_not_found() => Ok(false),
                _ => Err(anyhow::Error::new(err)
                    .context(format!("Failed to check object s3://{}/{}", bucket, key))),
            },
        }
    }

    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .with_context(|| format!("Failed to list objects in s3://{}/{}", bucket, prefix))?;

            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|object| object.key().map(str::to_string)),
            );

            match (page.is_truncated(), page.next_continuation_token()) {
                (Some(true), Some(token)) => continuation_token = Some(token.to_string()),
                _ => break,
            }
        }

        tracing::debug!(bucket, prefix, count = keys.len(), "listed objects");
        Ok(keys)
    }

    async fn stream_to(
        &self,
        bucket: &str,
        key: &str,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
    ) -> Result<u64> {
        let mut object = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to get object s3://{}/{}", bucket, key))?;

        let mut total_bytes = 0u64;
        while let Some(chunk) = object
            .body
            .try_next()
            .await
            .with_context(|| format!("Failed while streaming s3://{}/{}", bucket, key))?
        {
            sink.write_all(&chunk)
                .await
                .context("Failed to write downloaded chunk")?;
            total_bytes += chunk.len() as u64;
        }
        sink.flush().await.context("Failed to flush downloaded object")?;

        Ok(total_bytes)
    }
}
