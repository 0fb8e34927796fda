//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;
use clap_num::number_range;

fn parse_jobs(value: &str) -> Result<usize, String> {
    number_range(value, 1, 64)
}

fn parse_frame_rate(value: &str) -> Result<u32, String> {
    number_range(value, 1, 240)
}

fn parse_timeout(value: &str) -> Result<u64, String> {
    number_range(value, 1, 86_400)
}

/// Options of the merge command
///
/// Every option left unset falls back to the config file, then to the
/// built-in default.
#[derive(Args, Debug, Clone, Default)]
pub struct MergeArgs {
    /// Config file (TOML, or YAML for .yaml/.yml); defaults to ./dashmerge.toml
    #[arg(long, env = "DASHMERGE_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Also scan subdirectories of the source directory
    #[arg(short, long, env = "DASHMERGE_RECURSIVE")]
    pub recursive: bool,

    /// Maximum concurrent transcodes (1-64)
    #[arg(short, long, env = "DASHMERGE_JOBS", value_parser = parse_jobs)]
    pub jobs: Option<usize>,

    /// Maximum concurrent probes (1-64)
    #[arg(long, env = "DASHMERGE_PROBE_JOBS", value_parser = parse_jobs)]
    pub probe_jobs: Option<usize>,

    /// Video encoder passed to ffmpeg (e.g. libx264, h264_videotoolbox)
    #[arg(long, env = "DASHMERGE_VIDEO_CODEC")]
    pub video_codec: Option<String>,

    /// Output frame rate (1-240)
    #[arg(long, env = "DASHMERGE_FRAME_RATE", value_parser = parse_frame_rate)]
    pub frame_rate: Option<u32>,

    /// Re-merge groups whose output file already exists
    #[arg(long, env = "DASHMERGE_OVERWRITE")]
    pub overwrite: bool,

    /// Output arrangement under the destination directory
    #[arg(long, env = "DASHMERGE_LAYOUT", value_parser = ["nested", "flat"])]
    pub layout: Option<String>,

    /// Seconds any single ffmpeg/ffprobe run may take
    #[arg(long, env = "DASHMERGE_TIMEOUT", value_name = "SECS", value_parser = parse_timeout)]
    pub timeout: Option<u64>,

    /// Path to the ffmpeg binary
    #[arg(long, env = "DASHMERGE_FFMPEG", value_name = "PATH")]
    pub ffmpeg: Option<String>,

    /// Path to the ffprobe binary
    #[arg(long, env = "DASHMERGE_FFPROBE", value_name = "PATH")]
    pub ffprobe: Option<String>,

    /// Scan, probe and plan, but write nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Logging level (RUST_LOG takes precedence)
    #[arg(
        long,
        env = "DASHMERGE_LOG_LEVEL",
        value_parser = ["error", "warn", "info", "debug", "trace"]
    )]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, env = "DASHMERGE_LOG_FORMAT", value_parser = ["pretty", "compact", "json"])]
    pub log_format: Option<String>,
}
