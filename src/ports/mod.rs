// Ports - Interface definitions (contracts)

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempDir;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Port for media file inspection
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Report bit rate, audio presence and duration of a clip
    ///
    /// Any failure to read the file is a `DomainError::ProbeFailure`.
    async fn probe_clip(&self, file_path: &Path) -> Result<MediaProbe, DomainError>;
}

/// Port for the external transcoding engine
#[async_trait]
pub trait ExecutePort: Send + Sync {
    /// Re-encode `plan.clip` at the plan's constant bit rate into `output`,
    /// adding a silent audio track when the plan asks for one
    async fn transcode(&self, plan: &TranscodePlan, output: &Path) -> Result<(), DomainError>;

    /// Join uniform clips, in order, into `output` without re-encoding
    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<(), DomainError>;
}

/// Port for file system operations
#[async_trait]
pub trait FsPort: Send + Sync {
    /// List regular files under `dir`, sorted by path
    async fn list_files(&self, dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, DomainError>;

    /// Create the destination root if needed and check that it is writable
    async fn ensure_destination(&self, dir: &Path) -> Result<(), DomainError>;

    /// Check if file exists
    async fn file_exists(&self, file_path: &Path) -> bool;

    /// Create a group-scoped scratch directory beside `output`
    ///
    /// The directory and everything in it is removed when the returned
    /// handle is dropped.
    async fn create_staging_dir(&self, output: &Path, key: &GroupKey)
        -> Result<TempDir, DomainError>;

    /// Remove `dir` and its ancestors below `root` while they are empty
    async fn prune_empty_dirs(&self, dir: &Path, root: &Path);

    /// Move a finished file into its final place atomically
    async fn commit(&self, from: &Path, to: &Path) -> Result<(), DomainError>;
}
