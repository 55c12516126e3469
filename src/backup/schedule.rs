// dgraph-backup/src/backup/schedule.rs
use std::future::Future;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

use super::export_request::ExportTrigger;
use super::logic::{BackupPipeline, BackupReport};
use crate::errors::{PipelineError, Severity};
use crate::storage::ObjectStore;

/// Runs the pipeline every `every`, starting immediately, until `shutdown`
/// resolves or a run fails fatally.
///
/// Runs never overlap: a tick that fires while a run is in flight is
/// skipped. Tolerated failures are logged and the schedule continues.
/// Returns the number of runs that were started.
pub async fn run_on_interval<E, S, F, R>(
    pipeline: &mut BackupPipeline<E, S>,
    every: Duration,
    shutdown: F,
    mut on_report: R,
) -> Result<u64, PipelineError>
where
    E: ExportTrigger,
    S: ObjectStore,
    F: Future<Output = ()>,
    R: FnMut(&BackupReport),
{
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    let mut runs = 0u64;
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        runs += 1;
        info!(run = runs, "Starting scheduled backup");
        let result = tokio::select! {
            biased;
            _ = &mut shutdown => {
                warn!(run = runs, "Shutdown requested during a backup run");
                break;
            }
            result = pipeline.run() => result,
        };

        match result {
            Ok(report) => on_report(&report),
            Err(e) if e.severity() == Severity::Tolerated => {
                warn!(run = runs, stage = %e.stage(), error = %e, "Backup run failed, will retry on next tick");
            }
            Err(e) => {
                error!(run = runs, stage = %e.stage(), error = %e, "Backup run failed fatally, stopping schedule");
                return Err(e);
            }
        }
    }

    info!(runs, "Backup schedule stopped");
    Ok(runs)
}
