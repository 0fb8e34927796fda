//! FFprobe adapter for media file probing
//!
//! This module inspects clips by running `ffprobe` and reading its JSON report.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::adapters::process_runner::run_tool;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Subset of the `ffprobe -print_format json` document we rely on
#[derive(Debug, Deserialize)]
struct FfprobeReport {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    bit_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    bit_rate: Option<String>,
    duration: Option<String>,
}

/// FFprobe-based probe adapter
pub struct FFprobeAdapter {
    ffprobe_path: String,
    timeout: Duration,
}

impl FFprobeAdapter {
    /// Create new FFprobe adapter
    pub fn new(ffprobe_path: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
            timeout,
        }
    }

    /// Turn an ffprobe JSON report into a `MediaProbe`
    ///
    /// The video stream's own bit rate and duration are preferred; the
    /// container values are used when the stream does not carry them.
    pub fn parse_report(file_path: &Path, json: &[u8]) -> Result<MediaProbe, DomainError> {
        let failure = |message: String| DomainError::ProbeFailure {
            path: PathBuf::from(file_path),
            message,
        };

        let report: FfprobeReport = serde_json::from_slice(json)
            .map_err(|e| failure(format!("invalid ffprobe output: {}", e)))?;

        let video = report
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .ok_or_else(|| failure("no video stream".to_string()))?;
        let has_audio = report
            .streams
            .iter()
            .any(|s| s.codec_type.as_deref() == Some("audio"));

        let container_bit_rate = report.format.as_ref().and_then(|f| f.bit_rate.as_deref());
        let bit_rate = parse_u64(video.bit_rate.as_deref())
            .filter(|rate| *rate > 0)
            .or_else(|| parse_u64(container_bit_rate).filter(|rate| *rate > 0))
            .ok_or_else(|| failure("bit rate unavailable".to_string()))?;

        let container_duration = report.format.as_ref().and_then(|f| f.duration.as_deref());
        let duration_secs = parse_f64(video.duration.as_deref())
            .or_else(|| parse_f64(container_duration))
            .filter(|d| d.is_finite() && *d > 0.0);

        Ok(MediaProbe {
            bit_rate,
            has_audio,
            duration_secs,
        })
    }
}

fn parse_u64(value: Option<&str>) -> Option<u64> {
    value.and_then(|v| v.trim().parse::<u64>().ok())
}

fn parse_f64(value: Option<&str>) -> Option<f64> {
    value.and_then(|v| v.trim().parse::<f64>().ok())
}

#[async_trait]
impl ProbePort for FFprobeAdapter {
    async fn probe_clip(&self, file_path: &Path) -> Result<MediaProbe, DomainError> {
        let mut command = Command::new(&self.ffprobe_path);
        command
            .args(["-v", "error", "-print_format", "json", "-show_streams", "-show_format"])
            .arg(file_path);

        let output = run_tool(command, self.timeout)
            .await
            .map_err(|e| DomainError::ProbeFailure {
                path: file_path.to_path_buf(),
                message: e.to_string(),
            })?;

        let probe = Self::parse_report(file_path, &output.stdout)?;
        debug!(
            clip = %file_path.display(),
            bit_rate = probe.bit_rate,
            has_audio = probe.has_audio,
            "probed"
        );
        Ok(probe)
    }
}
