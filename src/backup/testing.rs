// dgraph-backup/src/backup/testing.rs
use async_trait::async_trait;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use url::Url;

use super::export_request::{ExportOutcome, ExportTrigger};
use crate::config::{ExportFormat, ExportSettings};
use crate::errors::PipelineError;
use crate::utils::backoff::BackoffPolicy;

/// Export trigger that answers every request with the same outcome.
pub struct FakeTrigger {
    outcome: ExportOutcome,
    calls: Arc<AtomicUsize>,
}

impl FakeTrigger {
    pub fn new(outcome: ExportOutcome) -> Self {
        Self {
            outcome,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared request counter, readable after the trigger has been moved.
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl ExportTrigger for FakeTrigger {
    fn endpoint(&self) -> &str {
        "http://localhost:8080/admin/export?format=json"
    }

    async fn request_export(&self) -> Result<ExportOutcome, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.outcome.clone())
    }
}

pub fn export_settings(root: &Path) -> ExportSettings {
    ExportSettings {
        dgraph_host: Url::parse("http://localhost:8080").unwrap(),
        format: ExportFormat::Json,
        export_path: root.join("export"),
        archive_dir: root.join("archives"),
        file_prefix: "dgraph-backup".to_string(),
        hostname: "node1".to_string(),
        http_timeout: Duration::from_secs(5),
    }
}

pub fn fast_poll(max_attempts: u32) -> BackoffPolicy {
    BackoffPolicy {
        initial_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(1),
        factor: 2.0,
        max_attempts,
    }
}

/// Lays out a minimal export the way the database writes one.
pub fn write_export(export: &Path) {
    let group = export.join("dgraph.r7.u1017.1200");
    fs::create_dir_all(&group).unwrap();
    fs::write(group.join("g01.json.gz"), b"data").unwrap();
    fs::write(group.join("g01.schema.gz"), b"schema").unwrap();
}
