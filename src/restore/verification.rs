// dgraph-backup/src/restore/verification.rs
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::RestoreError;

/// Files found in an unpacked backup, in walk order (sorted by file name).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreFileSet {
    pub data_files: Vec<PathBuf>,
    pub schema_files: Vec<PathBuf>,
}

impl RestoreFileSet {
    /// The schema handed to the loader. Only the first one found is used.
    pub fn primary_schema(&self) -> Option<&Path> {
        self.schema_files.first().map(PathBuf::as_path)
    }

    /// Fails when the backup carries no schema file; the loader cannot run
    /// without one no matter how many data files exist.
    pub fn require_schema(&self, root: &Path) -> Result<&Path, RestoreError> {
        self.primary_schema().ok_or_else(|| RestoreError::SchemaNotFound {
            dir: root.to_path_buf(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileKind {
    Data,
    Schema,
}

/// `*.rdf.gz` is data, `*.schema.gz` is schema, anything else is ignored.
fn classify(file_name: &str) -> Option<FileKind> {
    let mut segments = file_name.rsplit('.');
    if segments.next()? != "gz" {
        return None;
    }
    match segments.next()? {
        "rdf" => Some(FileKind::Data),
        "schema" => Some(FileKind::Schema),
        _ => None,
    }
}

/// Walks `root` and sorts the files it recognises.
pub fn classify_restore_files(root: &Path) -> Result<RestoreFileSet> {
    let mut files = RestoreFileSet::default();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let kind = classify(&entry.file_name().to_string_lossy());
        match kind {
            Some(FileKind::Data) => files.data_files.push(entry.into_path()),
            Some(FileKind::Schema) => files.schema_files.push(entry.into_path()),
            None => {}
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_classify_by_second_to_last_segment() {
        assert_eq!(classify("g01.rdf.gz"), Some(FileKind::Data));
        assert_eq!(classify("g01.schema.gz"), Some(FileKind::Schema));
        assert_eq!(classify("g01.json.gz"), None);
        assert_eq!(classify("g01.rdf"), None);
        assert_eq!(classify("gz"), None);
        assert_eq!(classify("notes.txt"), None);
    }

    #[test]
    fn test_walk_collects_data_and_schema_files() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let group = temp.path().join("export").join("dgraph.r1.u1017.0900");
        fs::create_dir_all(&group)?;
        fs::write(group.join("g02.rdf.gz"), b"")?;
        fs::write(group.join("g01.rdf.gz"), b"")?;
        fs::write(group.join("g01.schema.gz"), b"")?;
        fs::write(group.join("README.txt"), b"")?;

        let files = classify_restore_files(temp.path())?;
        assert_eq!(
            files.data_files,
            vec![group.join("g01.rdf.gz"), group.join("g02.rdf.gz")]
        );
        assert_eq!(files.schema_files, vec![group.join("g01.schema.gz")]);
        assert_eq!(files.require_schema(temp.path())?, group.join("g01.schema.gz"));
        Ok(())
    }

    #[test]
    fn test_missing_schema_is_fatal_even_with_data() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        fs::write(temp.path().join("g01.rdf.gz"), b"")?;

        let files = classify_restore_files(temp.path())?;
        assert_eq!(files.data_files.len(), 1);
        let err = files.require_schema(temp.path()).unwrap_err();
        assert!(matches!(err, RestoreError::SchemaNotFound { .. }));
        Ok(())
    }
}
