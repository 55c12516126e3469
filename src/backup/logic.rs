// dgraph-backup/src/backup/logic.rs
use chrono::Utc;
use std::path::Path;
use tracing::{error, info, warn};

use super::archive::{Archive, package_export};
use super::export_request::{ExportOutcome, ExportTrigger};
use super::s3_upload::ship_archive;
use crate::config::ExportSettings;
use crate::errors::{BoxError, ExportStage, PipelineError};
use crate::storage::{ObjectStore, RemoteObject};
use crate::utils::backoff::{Backoff, BackoffPolicy, PollOutcome, Readiness};

/// Result of an export run that reached cleanup.
#[derive(Debug)]
pub struct BackupReport {
    pub archive_name: String,
    /// Failed existence checks before the export directory appeared.
    pub poll_attempts: u32,
    /// Upload failures are reported here rather than aborting the run.
    pub upload: Result<RemoteObject, PipelineError>,
}

impl BackupReport {
    pub fn succeeded(&self) -> bool {
        self.upload.is_ok()
    }
}

/// Request → wait → package → upload → clean up.
///
/// The backoff state lives on the pipeline so that runs triggered by the
/// scheduler reuse it; it is reset whenever a wait finishes.
pub struct BackupPipeline<E, S> {
    settings: ExportSettings,
    trigger: E,
    store: S,
    backoff: Backoff,
}

impl<E, S> BackupPipeline<E, S>
where
    E: ExportTrigger,
    S: ObjectStore,
{
    pub fn new(settings: ExportSettings, poll: BackoffPolicy, trigger: E, store: S) -> Self {
        Self {
            settings,
            trigger,
            store,
            backoff: Backoff::new(poll),
        }
    }

    /// Runs one full export cycle.
    ///
    /// Returns `Err` only when the run ended before an archive existed
    /// (rejected or unreachable export, give-up, packaging failure). Once an
    /// archive exists, cleanup always runs and the upload result is carried
    /// in the report.
    pub async fn run(&mut self) -> Result<BackupReport, PipelineError> {
        enter(ExportStage::Requesting);
        match self.trigger.request_export().await? {
            ExportOutcome::Success => {}
            ExportOutcome::Failure(reason) => {
                return Err(PipelineError::ExportRejected {
                    url: self.trigger.endpoint().to_string(),
                    reason,
                });
            }
        }

        enter(ExportStage::WaitingForArtifact);
        let poll_attempts = self.wait_for_export().await?;

        enter(ExportStage::Packaging);
        let archive = self.package().await?;

        enter(ExportStage::Uploading);
        let upload = ship_archive(&self.store, &archive).await;
        if let Err(e) = &upload {
            error!(error = %e, cause = ?std::error::Error::source(e), "Failed to upload");
        }

        enter(ExportStage::CleaningUp);
        let archive_name = archive.file_name().to_string();
        clean_up(archive).await;

        enter(ExportStage::Done);
        Ok(BackupReport {
            archive_name,
            poll_attempts,
            upload,
        })
    }

    async fn wait_for_export(&mut self) -> Result<u32, PipelineError> {
        let export_path = self.settings.export_path.clone();
        let outcome = self
            .backoff
            .poll(|| {
                let ready = export_path.is_dir();
                async move {
                    if ready {
                        Readiness::Ready
                    } else {
                        Readiness::NotReady
                    }
                }
            })
            .await;

        match outcome {
            PollOutcome::Ready { attempts } => {
                info!(attempts, "Export directory {} is present", export_path.display());
                Ok(attempts)
            }
            PollOutcome::GaveUp { attempts } => Err(PipelineError::ArtifactTimedOut {
                path: export_path,
                attempts,
            }),
        }
    }

    async fn package(&self) -> Result<Archive, PipelineError> {
        let source_dir = self.settings.export_path.clone();
        let archive_dir = self.settings.archive_dir.clone();
        let prefix = self.settings.file_prefix.clone();
        let host = self.settings.hostname.clone();
        let created_at = Utc::now();

        let packaging_error = |source: BoxError| PipelineError::Packaging {
            path: self.settings.export_path.clone(),
            source,
        };

        tokio::task::spawn_blocking(move || {
            package_export(&source_dir, &archive_dir, &prefix, &host, created_at)
        })
        .await
        .map_err(|e| packaging_error(e.into()))?
        .map_err(|e| packaging_error(e.into()))
    }
}

fn enter(stage: ExportStage) {
    info!(stage = %stage, "Export pipeline stage");
}

/// Removes the local archive and the export directory. Failures are logged;
/// nothing here stops the run from completing.
async fn clean_up(archive: Archive) {
    remove_logged(archive.local_path(), false).await;
    remove_logged(archive.source_directory(), true).await;
}

async fn remove_logged(path: &Path, recursive: bool) {
    let result = if recursive {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    match result {
        Ok(()) => info!("Removed {}", path.display()),
        Err(e) => warn!(error = %e, "Failed to remove {}", path.display()),
    }
}
