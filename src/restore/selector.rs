// dgraph-backup/src/restore/selector.rs
use anyhow::Result;
use dialoguer::Select;
use dialoguer::theme::ColorfulTheme;
use tracing::info;

use crate::errors::RestoreError;
use crate::storage::{BackupCandidate, ObjectStore};

/// Picks one of the listed backups. `Ok(None)` means the operator backed out.
pub trait SnapshotChooser {
    fn choose(&self, candidates: &[BackupCandidate]) -> Result<Option<usize>>;
}

/// Interactive terminal menu.
pub struct TerminalChooser;

impl SnapshotChooser for TerminalChooser {
    fn choose(&self, candidates: &[BackupCandidate]) -> Result<Option<usize>> {
        let labels: Vec<String> = candidates.iter().map(ToString::to_string).collect();
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Select backup to restore")
            .items(&labels)
            .default(0)
            .interact_opt()?;
        Ok(selection)
    }
}

/// Lists the bucket and lets `chooser` pick a backup.
pub async fn select_snapshot<S, C>(store: &S, chooser: &C) -> Result<BackupCandidate, RestoreError>
where
    S: ObjectStore + ?Sized,
    C: SnapshotChooser + ?Sized,
{
    let bucket = store.bucket().to_string();
    let mut candidates = store
        .list_objects()
        .await
        .map_err(|e| RestoreError::Listing {
            bucket: bucket.clone(),
            source: e.into(),
        })?;
    if candidates.is_empty() {
        return Err(RestoreError::NoSnapshots { bucket });
    }
    info!(count = candidates.len(), %bucket, "Listed backups");

    let index = chooser
        .choose(&candidates)
        .map_err(|e| RestoreError::Selection { source: e.into() })?
        .ok_or(RestoreError::SelectionCancelled)?;
    if index >= candidates.len() {
        return Err(RestoreError::Selection {
            source: format!(
                "selected index {} is outside the {} listed backups",
                index,
                candidates.len()
            )
            .into(),
        });
    }

    let chosen = candidates.swap_remove(index);
    info!(key = %chosen.key, "Backup selected");
    Ok(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::MemoryStore;
    use chrono::{TimeZone, Utc};

    struct Fixed(Option<usize>);

    impl SnapshotChooser for Fixed {
        fn choose(&self, _candidates: &[BackupCandidate]) -> Result<Option<usize>> {
            Ok(self.0)
        }
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        store.insert("dgraph-backup-node1-2026-10-16T12:00:00Z.zip", vec![0; 10], Some(at));
        store.insert("dgraph-backup-node1-2026-10-17T12:00:00Z.zip", vec![0; 20], Some(at));
        store
    }

    #[tokio::test]
    async fn test_choice_maps_back_to_structured_candidate() -> anyhow::Result<()> {
        let chosen = select_snapshot(&seeded(), &Fixed(Some(1))).await?;
        assert_eq!(chosen.key, "dgraph-backup-node1-2026-10-17T12:00:00Z.zip");
        assert_eq!(chosen.size, 20);
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_bucket_is_reported() {
        let err = select_snapshot(&MemoryStore::new(), &Fixed(Some(0)))
            .await
            .unwrap_err();
        assert!(matches!(err, RestoreError::NoSnapshots { ref bucket } if bucket == "test-bucket"));
    }

    #[tokio::test]
    async fn test_cancel_and_out_of_range() {
        let cancelled = select_snapshot(&seeded(), &Fixed(None)).await.unwrap_err();
        assert!(matches!(cancelled, RestoreError::SelectionCancelled));

        let out_of_range = select_snapshot(&seeded(), &Fixed(Some(7))).await.unwrap_err();
        assert!(matches!(out_of_range, RestoreError::Selection { .. }));
    }

    #[tokio::test]
    async fn test_listing_failure_keeps_cause() {
        let store = MemoryStore::rejecting_listing("AccessDenied");
        let err = select_snapshot(&store, &Fixed(Some(0))).await.unwrap_err();
        match err {
            RestoreError::Listing { source, .. } => {
                assert!(source.to_string().contains("AccessDenied"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
