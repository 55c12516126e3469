// dgraph-backup/src/backup/s3_upload.rs
use tracing::info;

use super::archive::Archive;
use crate::errors::PipelineError;
use crate::storage::{ObjectStore, RemoteObject};

/// Ships a packaged archive to the object store under its file name.
///
/// Every store-side failure (credentials, network, missing bucket) is folded
/// into a single [`PipelineError::Upload`] carrying the underlying cause.
pub async fn ship_archive<S>(store: &S, archive: &Archive) -> Result<RemoteObject, PipelineError>
where
    S: ObjectStore + ?Sized,
{
    let key = archive.file_name();
    let remote = store
        .upload_file(archive.local_path(), key)
        .await
        .map_err(|e| PipelineError::Upload {
            path: archive.local_path().to_path_buf(),
            bucket: store.bucket().to_string(),
            source: e.into(),
        })?;

    info!(
        bucket = %remote.bucket,
        key = %remote.key,
        "Uploaded to {}",
        remote.location
    );
    Ok(remote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::archive::package_export;
    use crate::storage::testing::MemoryStore;
    use chrono::{TimeZone, Utc};
    use std::fs;

    fn packaged(root: &std::path::Path) -> anyhow::Result<Archive> {
        let export = root.join("export");
        fs::create_dir_all(&export)?;
        fs::write(export.join("g01.rdf.gz"), b"rdf")?;
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        package_export(&export, root, "dgraph-backup", "node1", at)
    }

    #[tokio::test]
    async fn test_key_is_archive_file_name() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let archive = packaged(temp.path())?;
        let store = MemoryStore::new();

        let remote = ship_archive(&store, &archive).await?;
        assert_eq!(remote.key, "dgraph-backup-node1-2026-10-17T12:00:00Z.zip");
        assert_eq!(store.keys(), vec![remote.key.clone()]);
        assert_eq!(store.get(&remote.key), Some(fs::read(archive.local_path())?));
        Ok(())
    }

    #[tokio::test]
    async fn test_store_failure_becomes_upload_error_with_cause() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let archive = packaged(temp.path())?;
        let store = MemoryStore::rejecting_uploads("InvalidAccessKeyId");

        let err = ship_archive(&store, &archive).await.unwrap_err();
        match &err {
            PipelineError::Upload { bucket, source, .. } => {
                assert_eq!(bucket, "test-bucket");
                assert!(source.to_string().contains("InvalidAccessKeyId"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        Ok(())
    }
}
