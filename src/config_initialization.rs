//! Configuration initialization and hierarchy management

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::{MergeConfig, TomlConfigAdapter};
use crate::cli::MergeArgs;
use crate::domain::model::OutputLayout;

/// Where the effective configuration came from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigReport {
    /// Config file that was loaded, if any
    pub file: Option<PathBuf>,
    /// Settings taken from the command line or `DASHMERGE_*` variables
    pub overrides: Vec<&'static str>,
}

impl ConfigReport {
    /// Log the report once the subscriber is installed
    pub fn log(&self) {
        match &self.file {
            Some(file) => info!("Loaded configuration from {}", file.display()),
            None => info!("No config file found, using defaults"),
        }
        if !self.overrides.is_empty() {
            info!(
                "Applied {} command line/environment overrides: {}",
                self.overrides.len(),
                self.overrides.join(", ")
            );
        }
    }
}

/// Resolve configuration following precedence: CLI > Env > File > Defaults
///
/// Clap already folds `DASHMERGE_*` variables into `args`, so the env and
/// CLI layers arrive together.
pub fn initialize_configuration_hierarchy(
    args: &MergeArgs,
    cwd: &Path,
) -> Result<(MergeConfig, ConfigReport)> {
    let mut report = ConfigReport {
        file: TomlConfigAdapter::locate(args.config.as_deref(), cwd),
        ..ConfigReport::default()
    };

    let mut config = match &report.file {
        Some(file) => TomlConfigAdapter::load(file)
            .with_context(|| format!("Failed to load configuration from {}", file.display()))?,
        None => MergeConfig::default(),
    };

    report.overrides = apply_overrides(&mut config, args)?;
    config.validate().context("Invalid configuration")?;
    Ok((config, report))
}

/// Apply explicitly given options on top of `config`
fn apply_overrides(config: &mut MergeConfig, args: &MergeArgs) -> Result<Vec<&'static str>> {
    let mut applied = Vec::new();

    if args.recursive {
        config.recursive = true;
        applied.push("recursive");
    }
    if let Some(jobs) = args.jobs {
        config.jobs = jobs;
        applied.push("jobs");
    }
    if let Some(probe_jobs) = args.probe_jobs {
        config.probe_jobs = probe_jobs;
        applied.push("probe_jobs");
    }
    if let Some(codec) = &args.video_codec {
        config.encoding.video_codec = codec.clone();
        applied.push("video_codec");
    }
    if let Some(frame_rate) = args.frame_rate {
        config.encoding.frame_rate = frame_rate;
        applied.push("frame_rate");
    }
    if args.overwrite {
        config.overwrite = true;
        applied.push("overwrite");
    }
    if let Some(layout) = &args.layout {
        config.layout = OutputLayout::parse(layout)?;
        applied.push("layout");
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
        applied.push("timeout");
    }
    if let Some(ffmpeg) = &args.ffmpeg {
        config.ffmpeg_path = ffmpeg.clone();
        applied.push("ffmpeg");
    }
    if let Some(ffprobe) = &args.ffprobe {
        config.ffprobe_path = ffprobe.clone();
        applied.push("ffprobe");
    }
    if let Some(level) = &args.log_level {
        config.log_level = level.clone();
        applied.push("log_level");
    }
    if let Some(format) = &args.log_format {
        config.log_format = format.clone();
        applied.push("log_format");
    }

    Ok(applied)
}
