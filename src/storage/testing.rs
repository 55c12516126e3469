// dgraph-backup/src/storage/testing.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use super::{BackupCandidate, ObjectStore, RemoteObject};

/// In-memory bucket for tests. Clones share the same contents.
#[derive(Clone, Default)]
pub(crate) struct MemoryStore {
    objects: Arc<Mutex<BTreeMap<String, (Vec<u8>, Option<DateTime<Utc>>)>>>,
    reject_uploads: Option<String>,
    reject_listing: Option<String>,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// A store whose uploads all fail with `reason`.
    pub(crate) fn rejecting_uploads(reason: &str) -> Self {
        Self {
            reject_uploads: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// A store whose listings all fail with `reason`.
    pub(crate) fn rejecting_listing(reason: &str) -> Self {
        Self {
            reject_listing: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn insert(&self, key: &str, bytes: Vec<u8>, last_modified: Option<DateTime<Utc>>) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (bytes, last_modified));
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub(crate) fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).map(|(bytes, _)| bytes.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    fn bucket(&self) -> &str {
        "test-bucket"
    }

    async fn upload_file(&self, path: &Path, key: &str) -> Result<RemoteObject> {
        if let Some(reason) = &self.reject_uploads {
            anyhow::bail!("{}", reason);
        }
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        self.insert(key, bytes, Some(Utc::now()));
        Ok(RemoteObject {
            bucket: self.bucket().to_string(),
            key: key.to_string(),
            location: format!("memory://{}/{}", self.bucket(), key),
        })
    }

    async fn list_objects(&self) -> Result<Vec<BackupCandidate>> {
        if let Some(reason) = &self.reject_listing {
            anyhow::bail!("{}", reason);
        }
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .map(|(key, (bytes, last_modified))| BackupCandidate {
                key: key.clone(),
                size: bytes.len() as i64,
                last_modified: *last_modified,
            })
            .collect())
    }

    async fn download_object(&self, key: &str, destination: &Path) -> Result<u64> {
        let bytes = self
            .get(key)
            .with_context(|| format!("NoSuchKey: {}", key))?;
        std::fs::write(destination, &bytes)
            .with_context(|| format!("Failed to write {}", destination.display()))?;
        Ok(bytes.len() as u64)
    }
}
