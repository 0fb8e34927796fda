// Local filesystem adapter - Directory listing, staging and atomic commits

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Filesystem adapter backed by the local disk
#[derive(Debug, Default)]
pub struct LocalFsAdapter;

impl LocalFsAdapter {
    /// Create new local filesystem adapter
    pub fn new() -> Self {
        Self
    }

    fn walk(dir: &Path, recursive: bool) -> Vec<PathBuf> {
        let max_depth = if recursive { usize::MAX } else { 1 };
        let mut files = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(max_depth) {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(e) => warn!("Skipping unreadable entry under {}: {}", dir.display(), e),
            }
        }
        files.sort();
        files
    }
}

fn write_failure(path: &Path, message: impl std::fmt::Display) -> DomainError {
    DomainError::DestinationWriteFailure {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

#[async_trait]
impl FsPort for LocalFsAdapter {
    async fn list_files(&self, dir: &Path, recursive: bool) -> Result<Vec<PathBuf>, DomainError> {
        let metadata = tokio::fs::metadata(dir).await.map_err(|e| {
            DomainError::BadArgs(format!("Cannot read source directory {}: {}", dir.display(), e))
        })?;
        if !metadata.is_dir() {
            return Err(DomainError::BadArgs(format!(
                "Source path is not a directory: {}",
                dir.display()
            )));
        }

        let dir = dir.to_path_buf();
        tokio::task::spawn_blocking(move || Self::walk(&dir, recursive))
            .await
            .map_err(|e| DomainError::BadArgs(format!("Directory scan aborted: {}", e)))
    }

    async fn ensure_destination(&self, dir: &Path) -> Result<(), DomainError> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| write_failure(dir, e))?;

        // Creating (and immediately dropping) a scratch file proves write access.
        tempfile::Builder::new()
            .prefix(".dashmerge-write-check")
            .tempfile_in(dir)
            .map(drop)
            .map_err(|e| write_failure(dir, e))
    }

    async fn file_exists(&self, file_path: &Path) -> bool {
        tokio::fs::try_exists(file_path).await.unwrap_or(false)
    }

    async fn create_staging_dir(
        &self,
        output: &Path,
        key: &GroupKey,
    ) -> Result<TempDir, DomainError> {
        let parent = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let prefix = format!(".dashmerge-{}-", key.slug());

        // A failing sibling group may prune the shared parent between the
        // two calls below, so a vanished parent is recreated a few times.
        let mut attempts = 0;
        loop {
            attempts += 1;
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| write_failure(parent, e))?;
            match tempfile::Builder::new().prefix(&prefix).tempdir_in(parent) {
                Ok(staging) => return Ok(staging),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound && attempts < 3 => continue,
                Err(e) => return Err(write_failure(parent, e)),
            }
        }
    }

    async fn prune_empty_dirs(&self, dir: &Path, root: &Path) {
        for candidate in dir.ancestors() {
            if candidate == root || !candidate.starts_with(root) {
                break;
            }
            // Fails on non-empty directories, which ends the walk.
            if tokio::fs::remove_dir(candidate).await.is_err() {
                break;
            }
            debug!(dir = %candidate.display(), "Removed empty directory");
        }
    }

    async fn commit(&self, from: &Path, to: &Path) -> Result<(), DomainError> {
        tokio::fs::rename(from, to)
            .await
            .map_err(|e| write_failure(to, e))
    }
}
