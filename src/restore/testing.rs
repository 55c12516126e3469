// dgraph-backup/src/restore/testing.rs
use chrono::{DateTime, TimeZone, Utc};
use std::fs;
use std::path::Path;

use crate::backup::archive::package_export;
use crate::config::RestoreSettings;
use crate::storage::testing::MemoryStore;

pub fn restore_settings(root: &Path) -> RestoreSettings {
    RestoreSettings {
        download_dir: root.join("downloads"),
        restore_dir: root.join("data"),
        alpha_addr: "localhost:9080".to_string(),
        zero_addr: "localhost:5080".to_string(),
        loader_bin: "dgraph".to_string(),
        loader_answer: "4".to_string(),
        loader_prompt: None,
        timeout: None,
    }
}

/// Packages a one-group export under `root` and stores it in `store`,
/// returning its key.
pub fn stored_backup(root: &Path, store: &MemoryStore) -> anyhow::Result<String> {
    let at = Utc.with_ymd_and_hms(2026, 10, 17, 8, 0, 0).unwrap();
    stored_snapshot(root, store, "dgraph.r3.u1017.0800", at)
}

/// Packages an export holding only the `group` directory, taken at `at`.
pub fn stored_snapshot(
    root: &Path,
    store: &MemoryStore,
    group: &str,
    at: DateTime<Utc>,
) -> anyhow::Result<String> {
    let export = root.join("export");
    if export.exists() {
        fs::remove_dir_all(&export)?;
    }
    let group = export.join(group);
    fs::create_dir_all(&group)?;
    fs::write(group.join("g01.rdf.gz"), b"rdf")?;
    fs::write(group.join("g01.schema.gz"), b"schema")?;
    let archive = package_export(&export, root, "dgraph-backup", "node1", at)?;
    store.insert(archive.file_name(), fs::read(archive.local_path())?, Some(at));
    Ok(archive.file_name().to_string())
}
