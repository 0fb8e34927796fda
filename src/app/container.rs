use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{FFmpegAdapter, FFprobeAdapter, LocalFsAdapter, MergeConfig};
use crate::app::merge_interactor::MergeInteractor;
use crate::domain::errors::DomainError;
use crate::ports::{ExecutePort, FsPort, ProbePort};

pub trait AppContainer: Send + Sync {
    fn merge_interactor(&self) -> Arc<MergeInteractor>;
}

/// Wires the ffmpeg/ffprobe and local filesystem adapters into the interactors
pub struct DefaultAppContainer {
    merge_interactor: Arc<MergeInteractor>,
}

impl DefaultAppContainer {
    pub fn new(config: &MergeConfig) -> Result<Self, DomainError> {
        config.validate()?;
        let timeout = Duration::from_secs(config.timeout_secs);

        let probe_port = Arc::new(FFprobeAdapter::new(config.ffprobe_path.clone(), timeout));
        let execute_port = Arc::new(FFmpegAdapter::new(
            config.ffmpeg_path.clone(),
            config.encoding.clone(),
            timeout,
        ));
        let fs_port = Arc::new(LocalFsAdapter::new());

        let merge_interactor = Arc::new(MergeInteractor::new(
            probe_port as Arc<dyn ProbePort>,
            execute_port as Arc<dyn ExecutePort>,
            fs_port as Arc<dyn FsPort>,
            config.jobs,
            config.probe_jobs,
        ));

        Ok(Self { merge_interactor })
    }
}

impl AppContainer for DefaultAppContainer {
    fn merge_interactor(&self) -> Arc<MergeInteractor> {
        Arc::clone(&self.merge_interactor)
    }
}
