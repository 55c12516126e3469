// dgraph-backup/src/backup/mod.rs
pub(crate) mod archive;
pub(crate) mod export_request;
mod logic;
pub(crate) mod s3_upload;
mod schedule;
#[cfg(test)]
pub(crate) mod testing;

pub use logic::{BackupPipeline, BackupReport};
pub use schedule::run_on_interval;

use crate::config::AppConfig;
use crate::errors::PipelineError;
use crate::storage::S3Store;
use anyhow::Result;
use export_request::HttpExportTrigger;

/// Builds the production pipeline: HTTP export trigger plus S3 storage.
pub fn build_pipeline(
    config: &AppConfig,
    store: S3Store,
) -> Result<BackupPipeline<HttpExportTrigger, S3Store>> {
    let trigger = HttpExportTrigger::new(&config.export)?;
    Ok(BackupPipeline::new(
        config.export.clone(),
        config.poll,
        trigger,
        store,
    ))
}

/// Console summary of a finished run.
pub fn print_report(report: &BackupReport) {
    println!("{}", packaging_summary(report));
    match &report.upload {
        Ok(remote) => println!("[DONE] Uploaded to {}", remote.location),
        Err(e) => print_failure(e),
    }
}

fn packaging_summary(report: &BackupReport) -> String {
    format!(
        "Packaged {} after {} poll attempt(s)",
        report.archive_name, report.poll_attempts
    )
}

pub fn print_failure(err: &PipelineError) {
    eprintln!("❌ Backup failed while {}: {}", err.stage(), err);
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        eprintln!("   caused by: {}", cause);
        source = cause.source();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::RemoteObject;

    #[test]
    fn test_summary_names_archive_and_poll_attempts() {
        let report = BackupReport {
            archive_name: "dgraph-backup-node1-2026-10-17T08:00:00Z.zip".to_string(),
            poll_attempts: 3,
            upload: Ok(RemoteObject {
                bucket: "b".to_string(),
                key: "k".to_string(),
                location: "https://b.s3.ap-northeast-2.amazonaws.com/k".to_string(),
            }),
        };
        assert_eq!(
            packaging_summary(&report),
            "Packaged dgraph-backup-node1-2026-10-17T08:00:00Z.zip after 3 poll attempt(s)"
        );
    }
}
