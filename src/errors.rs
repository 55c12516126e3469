use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// How the top-level run loop treats an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Abort the whole run (and the scheduler, when running on a timer).
    Fatal,
    /// Report the failure and carry on.
    Tolerated,
}

/// Stages of one export run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStage {
    Requesting,
    WaitingForArtifact,
    Packaging,
    Uploading,
    CleaningUp,
    Done,
}

impl fmt::Display for ExportStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportStage::Requesting => "requesting export",
            ExportStage::WaitingForArtifact => "waiting for export",
            ExportStage::Packaging => "packaging",
            ExportStage::Uploading => "uploading",
            ExportStage::CleaningUp => "cleaning up",
            ExportStage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("cannot reach export endpoint {url}")]
    ExportTransport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("export was not accepted by {url}: {reason}")]
    ExportRejected { url: String, reason: String },

    #[error("export directory {} did not appear after {attempts} attempts", .path.display())]
    ArtifactTimedOut { path: PathBuf, attempts: u32 },

    #[error("failed to package {}", .path.display())]
    Packaging {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("failed to upload {} to bucket {bucket}", .path.display())]
    Upload {
        path: PathBuf,
        bucket: String,
        #[source]
        source: BoxError,
    },
}

impl PipelineError {
    pub fn stage(&self) -> ExportStage {
        match self {
            PipelineError::ExportTransport { .. } | PipelineError::ExportRejected { .. } => {
                ExportStage::Requesting
            }
            PipelineError::ArtifactTimedOut { .. } => ExportStage::WaitingForArtifact,
            PipelineError::Packaging { .. } => ExportStage::Packaging,
            PipelineError::Upload { .. } => ExportStage::Uploading,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            PipelineError::ExportRejected { .. } | PipelineError::Upload { .. } => {
                Severity::Tolerated
            }
            _ => Severity::Fatal,
        }
    }
}

/// Stages of a restore run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStage {
    Selecting,
    Retrieving,
    Classifying,
    Loading,
}

impl fmt::Display for RestoreStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RestoreStage::Selecting => "selecting backup",
            RestoreStage::Retrieving => "retrieving backup",
            RestoreStage::Classifying => "classifying files",
            RestoreStage::Loading => "loading data",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("failed to list backups in bucket {bucket}")]
    Listing {
        bucket: String,
        #[source]
        source: BoxError,
    },

    #[error("bucket {bucket} contains no backups")]
    NoSnapshots { bucket: String },

    #[error("no backup was selected")]
    SelectionCancelled,

    #[error("backup selection failed")]
    Selection {
        #[source]
        source: BoxError,
    },

    #[error("failed to download {key} from bucket {bucket}")]
    Download {
        bucket: String,
        key: String,
        #[source]
        source: BoxError,
    },

    #[error("failed to unpack {}", .path.display())]
    Unpack {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("no schema file (*.schema.gz) found under {}", .dir.display())]
    SchemaNotFound { dir: PathBuf },

    #[error("failed to start loader {program}")]
    LoaderStart {
        program: String,
        #[source]
        source: BoxError,
    },

    #[error("loader did not exit within {}s and was killed", .after.as_secs())]
    LoaderTimedOut { after: Duration },

    #[error("lost contact with the loader process")]
    LoaderIo {
        #[source]
        source: std::io::Error,
    },
}

impl RestoreError {
    pub fn stage(&self) -> RestoreStage {
        match self {
            RestoreError::Listing { .. }
            | RestoreError::NoSnapshots { .. }
            | RestoreError::SelectionCancelled
            | RestoreError::Selection { .. } => RestoreStage::Selecting,
            RestoreError::Download { .. } | RestoreError::Unpack { .. } => {
                RestoreStage::Retrieving
            }
            RestoreError::SchemaNotFound { .. } => RestoreStage::Classifying,
            RestoreError::LoaderStart { .. }
            | RestoreError::LoaderTimedOut { .. }
            | RestoreError::LoaderIo { .. } => RestoreStage::Loading,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            RestoreError::LoaderStart { .. } => Severity::Tolerated,
            _ => Severity::Fatal,
        }
    }
}
