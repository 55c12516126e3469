// dgraph-backup/src/restore/s3_download.rs
use anyhow::Context;
use std::path::{Path, PathBuf};
use tracing::info;

use super::verification::{RestoreFileSet, classify_restore_files};
use crate::backup::archive::extract_zip_archive;
use crate::config::RestoreSettings;
use crate::errors::{BoxError, RestoreError};
use crate::storage::ObjectStore;

/// A backup that has been downloaded and unpacked locally.
#[derive(Debug)]
pub struct RetrievedBackup {
    pub archive_path: PathBuf,
    /// This snapshot's own extraction directory, handed to the loader as
    /// its data path.
    pub restore_root: PathBuf,
    pub files: RestoreFileSet,
}

/// Local file name for an object key: its last path component.
pub fn local_file_name(key: &str) -> Option<&str> {
    Path::new(key).file_name().and_then(|name| name.to_str())
}

/// Directory under the restore root that one archive unpacks into: the
/// archive name without its `.zip` extension.
pub fn snapshot_dir_name(file_name: &str) -> &str {
    match file_name.strip_suffix(".zip") {
        Some(stem) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// Downloads `key` into the download directory, unpacks it into a fresh
/// per-snapshot directory under the restore directory and classifies what
/// came out. Files left behind by earlier restores are never picked up.
pub async fn retrieve<S>(
    store: &S,
    key: &str,
    settings: &RestoreSettings,
) -> Result<RetrievedBackup, RestoreError>
where
    S: ObjectStore + ?Sized,
{
    let download_error = |source: BoxError| RestoreError::Download {
        bucket: store.bucket().to_string(),
        key: key.to_string(),
        source,
    };

    let file_name = local_file_name(key)
        .ok_or_else(|| download_error(format!("object key {:?} has no file name", key).into()))?;
    tokio::fs::create_dir_all(&settings.download_dir)
        .await
        .map_err(|e| download_error(e.into()))?;
    let archive_path = settings.download_dir.join(file_name);

    info!(bucket = store.bucket(), key, "Downloading backup to {}", archive_path.display());
    let bytes = store
        .download_object(key, &archive_path)
        .await
        .map_err(|e| download_error(e.into()))?;
    println!("Downloaded {} ({} bytes)", archive_path.display(), bytes);

    let unpack_error = |source: BoxError| RestoreError::Unpack {
        path: archive_path.clone(),
        source,
    };
    let archive = archive_path.clone();
    let restore_root = settings.restore_dir.join(snapshot_dir_name(file_name));
    let root = restore_root.clone();
    let files = tokio::task::spawn_blocking(move || {
        clear_directory(&root)?;
        extract_zip_archive(&archive, &root)?;
        classify_restore_files(&root)
    })
    .await
    .map_err(|e| unpack_error(e.into()))?
    .map_err(|e| unpack_error(e.into()))?;

    info!(
        data_files = files.data_files.len(),
        schema_files = files.schema_files.len(),
        "Unpacked backup into {}",
        restore_root.display()
    );
    Ok(RetrievedBackup {
        archive_path,
        restore_root,
        files,
    })
}

/// Removes whatever a previous restore of the same snapshot left in `dir`.
fn clear_directory(dir: &Path) -> anyhow::Result<()> {
    if dir.exists() {
        info!("Clearing previous restore at {}", dir.display());
        std::fs::remove_dir_all(dir)
            .with_context(|| format!("Failed to clear restore directory: {}", dir.display()))?;
    }
    Ok(())
}
