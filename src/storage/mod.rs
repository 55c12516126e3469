// dgraph-backup/src/storage/mod.rs
mod s3;
#[cfg(test)]
pub(crate) mod testing;

pub use s3::S3Store;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::path::Path;

/// An object stored in the remote bucket after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub bucket: String,
    pub key: String,
    /// Canonical URL of the object.
    pub location: String,
}

/// One listed object, offered to the operator as a restore candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupCandidate {
    pub key: String,
    pub size: i64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl fmt::Display for BackupCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes", self.key, self.size)?;
        match &self.last_modified {
            Some(at) => write!(
                f,
                ", modified {})",
                at.to_rfc3339_opts(SecondsFormat::Secs, true)
            ),
            None => f.write_str(")"),
        }
    }
}

/// The three object-store operations the backup and restore flows need,
/// against a single bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn bucket(&self) -> &str;

    /// Streams the file at `path` to the bucket under `key`.
    async fn upload_file(&self, path: &Path, key: &str) -> Result<RemoteObject>;

    /// Lists the bucket's objects. Only the first page is returned.
    async fn list_objects(&self) -> Result<Vec<BackupCandidate>>;

    /// Downloads `key` to `destination`, returning the number of bytes written.
    async fn download_object(&self, key: &str, destination: &Path) -> Result<u64>;
}
