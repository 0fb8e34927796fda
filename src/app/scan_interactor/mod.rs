// Scan interactor - Discovers dashcam clips in a source directory

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Clips found by a scan plus the files that were passed over
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanResult {
    pub clips: Vec<ClipDescriptor>,
    pub unrecognized: Vec<PathBuf>,
}

/// Interactor for the clip discovery use case
pub struct ScanInteractor {
    fs_port: Arc<dyn FsPort>,
}

impl ScanInteractor {
    /// Create new scan interactor with injected ports
    pub fn new(fs_port: Arc<dyn FsPort>) -> Self {
        Self { fs_port }
    }

    /// Parse every file under `source` as a dashcam clip
    ///
    /// Files that do not follow the naming convention are reported and
    /// skipped; only an unreadable source directory fails the scan.
    pub async fn scan(&self, source: &Path, recursive: bool) -> Result<ScanResult, DomainError> {
        let files = self.fs_port.list_files(source, recursive).await?;
        let mut result = ScanResult::default();

        for file in files {
            match ClipDescriptor::parse(&file) {
                Ok(clip) => {
                    debug!(clip = %clip.display(), path = %file.display(), "recognized clip");
                    result.clips.push(clip);
                }
                Err(e) => {
                    warn!(path = %file.display(), "Skipping file: {}", e);
                    result.unrecognized.push(file);
                }
            }
        }

        info!(
            source = %source.display(),
            clips = result.clips.len(),
            skipped = result.unrecognized.len(),
            "Scan complete"
        );
        Ok(result)
    }
}
