// dgraph-backup/src/restore/mod.rs
pub(crate) mod db_restore;
mod logic;
pub(crate) mod s3_download;
pub(crate) mod selector;
#[cfg(test)]
pub(crate) mod testing;
pub(crate) mod verification;

pub use logic::{RestoreReport, run_restore};
pub use selector::TerminalChooser;

use crate::errors::RestoreError;

pub fn print_report(report: &RestoreReport) {
    for line in report_summary(report) {
        println!("{}", line);
    }
    match &report.loader {
        Ok(run) if run.success() => println!("[DONE] Loader finished: {}", run.status),
        Ok(run) => eprintln!("❌ Loader failed: {}", run.status),
        Err(e) => print_failure(e),
    }
}

fn report_summary(report: &RestoreReport) -> Vec<String> {
    let mut lines = vec![
        format!(
            "Restored {} ({}) into {}",
            report.key,
            report.archive_path.display(),
            report.restore_root.display()
        ),
        format!(
            "   {} data file(s), schema {}",
            report.data_files,
            report.schema.display()
        ),
    ];
    if let Ok(run) = &report.loader {
        let answered = if run.answered { "yes" } else { "no" };
        lines.push(format!("   Loader prompt answered: {}", answered));
    }
    lines
}

pub fn print_failure(err: &RestoreError) {
    eprintln!("❌ Restore failed while {}: {}", err.stage(), err);
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        eprintln!("   caused by: {}", cause);
        source = cause.source();
    }
}
