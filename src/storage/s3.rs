// dgraph-backup/src/storage/s3.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3 as s3;
use chrono::{DateTime, Utc};
use s3::config::Region;
use s3::primitives::ByteStream;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use super::{BackupCandidate, ObjectStore, RemoteObject};
use crate::config::StorageSettings;

/// S3 (or S3-compatible) bucket authenticated with a static key pair.
pub struct S3Store {
    client: s3::Client,
    settings: StorageSettings,
}

impl S3Store {
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

        // Custom endpoints (Spaces, MinIO) are addressed path-style.
        let s3_config = s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.endpoint_url.is_some())
            .build();

        Self {
            client: s3::Client::from_conf(s3_config),
            settings: settings.clone(),
        }
    }
}

/// Canonical URL of `key` in the configured bucket.
pub(crate) fn object_location(settings: &StorageSettings, key: &str) -> String {
    match &settings.endpoint_url {
        Some(endpoint) => format!(
            "{}/{}/{}",
            endpoint.trim_end_matches('/'),
            settings.bucket_name,
            key
        ),
        None => format!(
            "https://{}.s3.{}.amazonaws.com/{}",
            settings.bucket_name, settings.region, key
        ),
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn bucket(&self) -> &str {
        &self.settings.bucket_name
    }

    async fn upload_file(&self, path: &Path, key: &str) -> Result<RemoteObject> {
        info!(
            bucket = %self.settings.bucket_name,
            key,
            "Uploading {}",
            path.display()
        );

        let body = ByteStream::from_path(path)
            .await
            .with_context(|| format!("Failed to create ByteStream from file: {}", path.display()))?;

        self.client
            .put_object()
            .bucket(&self.settings.bucket_name)
            .key(key)
            .body(body)
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failed to upload file {} to S3 bucket {} with key {}",
                    path.display(),
                    self.settings.bucket_name,
                    key
                )
            })?;

        Ok(RemoteObject {
            bucket: self.settings.bucket_name.clone(),
            key: key.to_string(),
            location: object_location(&self.settings, key),
        })
    }

    async fn list_objects(&self) -> Result<Vec<BackupCandidate>> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.settings.bucket_name)
            .send()
            .await
            .with_context(|| format!("Failed to list objects in bucket {}", self.settings.bucket_name))?;

        if output.is_truncated().unwrap_or(false) {
            warn!(
                bucket = %self.settings.bucket_name,
                "Bucket listing is truncated; only the first page of backups is shown"
            );
        }

        let candidates = output
            .contents()
            .iter()
            .filter_map(|object| {
                let key = object.key()?.to_string();
                let last_modified = object
                    .last_modified()
                    .and_then(|at| DateTime::<Utc>::from_timestamp(at.secs(), at.subsec_nanos()));
                Some(BackupCandidate {
                    key,
                    size: object.size().unwrap_or_default(),
                    last_modified,
                })
            })
            .collect();
        Ok(candidates)
    }

    async fn download_object(&self, key: &str, destination: &Path) -> Result<u64> {
        let bucket = &self.settings.bucket_name;
        info!(bucket = %bucket, key, "Downloading to {}", destination.display());

        let parent_dir = destination
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        if !parent_dir.exists() {
            tokio::fs::create_dir_all(parent_dir)
                .await
                .with_context(|| format!("Failed to create directory for download: {}", parent_dir.display()))?;
        }

        let mut object = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to get object s3://{}/{}", bucket, key))?;

        // Stream into a sibling temp file so a broken transfer never leaves a
        // partial archive under the final name.
        let partial = NamedTempFile::new_in(parent_dir)
            .with_context(|| format!("Failed to create temporary file in {}", parent_dir.display()))?;
        let mut output_file = tokio::fs::File::from_std(
            partial
                .reopen()
                .context("Failed to reopen temporary download file")?,
        );

        let mut total_bytes_downloaded: u64 = 0;
        while let Some(bytes_chunk) = object
            .body
            .try_next()
            .await
            .with_context(|| format!("Failed to read body of s3://{}/{}", bucket, key))?
        {
            output_file
                .write_all(&bytes_chunk)
                .await
                .with_context(|| format!("Failed to write to destination file: {}", destination.display()))?;
            total_bytes_downloaded += bytes_chunk.len() as u64;
        }
        output_file.flush().await?;
        drop(output_file);

        partial
            .persist(destination)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to move download into place at {}", destination.display()))?;

        info!(
            bytes = total_bytes_downloaded,
            "Downloaded s3://{}/{} to {}",
            bucket,
            key,
            destination.display()
        );
        Ok(total_bytes_downloaded)
    }
}
