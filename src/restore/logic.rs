// dgraph-backup/src/restore/logic.rs
use std::path::PathBuf;
use tracing::{error, info};

use super::db_restore::{LoaderRun, drive_loader};
use super::s3_download::retrieve;
use super::selector::{SnapshotChooser, select_snapshot};
use crate::config::RestoreSettings;
use crate::errors::{RestoreError, RestoreStage, Severity};
use crate::storage::ObjectStore;

#[derive(Debug)]
pub struct RestoreReport {
    pub key: String,
    pub archive_path: PathBuf,
    pub restore_root: PathBuf,
    pub schema: PathBuf,
    pub data_files: usize,
    /// Tolerated loader failures end up here; fatal ones abort the restore.
    pub loader: Result<LoaderRun, RestoreError>,
}

impl RestoreReport {
    pub fn succeeded(&self) -> bool {
        matches!(&self.loader, Ok(run) if run.success())
    }
}

/// Select → retrieve → check schema → load.
pub async fn run_restore<S, C>(
    store: &S,
    chooser: &C,
    settings: &RestoreSettings,
) -> Result<RestoreReport, RestoreError>
where
    S: ObjectStore + ?Sized,
    C: SnapshotChooser + ?Sized,
{
    info!(stage = %RestoreStage::Selecting, "Restore stage");
    let candidate = select_snapshot(store, chooser).await?;

    info!(stage = %RestoreStage::Retrieving, "Restore stage");
    let retrieved = retrieve(store, &candidate.key, settings).await?;

    info!(stage = %RestoreStage::Classifying, "Restore stage");
    let schema = retrieved
        .files
        .require_schema(&retrieved.restore_root)?
        .to_path_buf();
    if retrieved.files.schema_files.len() > 1 {
        info!(
            count = retrieved.files.schema_files.len(),
            "Several schema files found, using {}",
            schema.display()
        );
    }

    info!(stage = %RestoreStage::Loading, "Restore stage");
    let loader = match drive_loader(settings, &retrieved.restore_root, &schema).await {
        Err(e) if e.severity() == Severity::Tolerated => {
            error!(error = %e, "Loader could not be started");
            Err(e)
        }
        Err(e) => return Err(e),
        Ok(run) => Ok(run),
    };

    Ok(RestoreReport {
        key: candidate.key,
        archive_path: retrieved.archive_path,
        restore_root: retrieved.restore_root,
        schema,
        data_files: retrieved.files.data_files.len(),
        loader,
    })
}
