// dgraph-backup/src/backup/archive.rs
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Top-level entry name used when the export directory has no usable name.
const FALLBACK_ROOT_NAME: &str = "export";

/// A packaged export, owned by the pipeline until cleanup consumes it.
#[derive(Debug)]
pub struct Archive {
    local_path: PathBuf,
    file_name: String,
    source_directory: PathBuf,
}

impl Archive {
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// Bare file name, also used as the remote object key.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn source_directory(&self) -> &Path {
        &self.source_directory
    }
}

/// `<prefix>-<host>-<RFC3339 timestamp>.zip`
pub fn archive_file_name(prefix: &str, host: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}-{}-{}.zip",
        prefix,
        host,
        at.to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

/// Packages `source_dir` into a uniquely named zip archive inside
/// `archive_dir`. A partially written archive is removed on failure.
pub fn package_export(
    source_dir: &Path,
    archive_dir: &Path,
    prefix: &str,
    host: &str,
    at: DateTime<Utc>,
) -> Result<Archive> {
    let file_name = archive_file_name(prefix, host, at);
    let local_path = archive_dir.join(&file_name);

    if let Err(e) = create_zip_archive(source_dir, &local_path) {
        if local_path.exists() {
            let _ = std::fs::remove_file(&local_path);
        }
        return Err(e);
    }

    Ok(Archive {
        local_path,
        file_name,
        source_directory: source_dir.to_path_buf(),
    })
}

/// Creates a zip archive from a source directory.
///
/// Entries are stored under the source directory's own name, so packaging
/// `./export` yields `export/...` inside the archive.
pub fn create_zip_archive(source_dir: &Path, archive_dest_path: &Path) -> Result<PathBuf> {
    if !source_dir.is_dir() {
        return Err(anyhow::anyhow!(
            "Source for archival is not a directory: {}",
            source_dir.display()
        ));
    }
    if let Some(parent) = archive_dest_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!(
                    "Failed to create parent directory for archive: {}",
                    parent.display()
                )
            })?;
        }
    }

    info!(
        "Creating zip archive from {} to {}",
        source_dir.display(),
        archive_dest_path.display()
    );

    let root_name = source_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| FALLBACK_ROOT_NAME.to_string());

    let archive_file = File::create(archive_dest_path).with_context(|| {
        format!(
            "Failed to create archive file: {}",
            archive_dest_path.display()
        )
    })?;
    let mut writer = ZipWriter::new(archive_file);

    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk directory: {}", source_dir.display()))?;
        let path = entry.path();
        let relative = path.strip_prefix(source_dir).with_context(|| {
            format!(
                "Failed to strip prefix {} from {}",
                source_dir.display(),
                path.display()
            )
        })?;
        let name = entry_name(&root_name, relative);

        if entry.file_type().is_dir() {
            writer
                .add_directory(name.clone(), entry_options())
                .with_context(|| format!("Failed to add directory {} to archive", name))?;
        } else if entry.file_type().is_file() {
            writer
                .start_file(name.clone(), entry_options())
                .with_context(|| format!("Failed to add file {} to archive", name))?;
            let mut source = File::open(path)
                .with_context(|| format!("Failed to open {} for archiving", path.display()))?;
            io::copy(&mut source, &mut writer)
                .with_context(|| format!("Failed to write {} into archive", path.display()))?;
        }
    }

    writer.finish().with_context(|| {
        format!(
            "Failed to finish zip archive: {}",
            archive_dest_path.display()
        )
    })?;

    info!("Zip archive created at {}", archive_dest_path.display());
    Ok(archive_dest_path.to_path_buf())
}

/// Extracts a zip archive into `extract_to_dir`, creating it if needed.
pub fn extract_zip_archive(archive_path: &Path, extract_to_dir: &Path) -> Result<PathBuf> {
    if !archive_path.is_file() {
        return Err(anyhow::anyhow!(
            "Archive for extraction is not a file: {}",
            archive_path.display()
        ));
    }

    if !extract_to_dir.exists() {
        std::fs::create_dir_all(extract_to_dir).with_context(|| {
            format!(
                "Failed to create extraction directory: {}",
                extract_to_dir.display()
            )
        })?;
    } else if !extract_to_dir.is_dir() {
        return Err(anyhow::anyhow!(
            "Extraction path exists but is not a directory: {}",
            extract_to_dir.display()
        ));
    }

    info!(
        "Extracting zip archive from {} to {}",
        archive_path.display(),
        extract_to_dir.display()
    );

    let archive_file = File::open(archive_path)
        .with_context(|| format!("Failed to open archive file: {}", archive_path.display()))?;
    let mut archive = ZipArchive::new(archive_file)
        .with_context(|| format!("Not a readable zip archive: {}", archive_path.display()))?;
    archive.extract(extract_to_dir).with_context(|| {
        format!(
            "Failed to unpack archive {} to {}",
            archive_path.display(),
            extract_to_dir.display()
        )
    })?;

    Ok(extract_to_dir.to_path_buf())
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Zip entry names always use `/`, whatever the host separator.
fn entry_name(root: &str, relative: &Path) -> String {
    let mut name = root.to_string();
    for component in relative.components() {
        name.push('/');
        name.push_str(&component.as_os_str().to_string_lossy());
    }
    name
}
