//! FFmpeg execution adapter
//!
//! This module re-encodes clips and joins them by driving the `ffmpeg` CLI.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::adapters::process_runner::run_tool;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// File name of the concat demuxer list written beside the concat output
const CONCAT_LIST_NAME: &str = "concat.ffconcat";

fn push(args: &mut Vec<OsString>, values: &[&str]) {
    args.extend(values.iter().map(OsString::from));
}

/// FFmpeg-based execution adapter
pub struct FFmpegAdapter {
    ffmpeg_path: String,
    encoding: EncodingSettings,
    timeout: Duration,
}

impl FFmpegAdapter {
    /// Create new FFmpeg adapter
    pub fn new(ffmpeg_path: impl Into<String>, encoding: EncodingSettings, timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            encoding,
            timeout,
        }
    }

    /// Arguments re-encoding one clip at the plan's constant bit rate
    pub fn transcode_args(&self, plan: &TranscodePlan, output: &Path) -> Vec<OsString> {
        let settings = &self.encoding;
        let rate = plan.target_bit_rate.to_string();
        let mut args = Vec::new();

        push(&mut args, &["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"]);
        args.push(plan.clip.path.clone().into_os_string());

        if plan.needs_synthetic_audio {
            push(&mut args, &["-f", "lavfi"]);
            if let Some(duration) = plan.duration_secs {
                push(&mut args, &["-t", &format!("{:.3}", duration)]);
            }
            let source = format!(
                "anullsrc=channel_layout={}:sample_rate={}",
                settings.channel_layout(),
                settings.audio_sample_rate
            );
            push(&mut args, &["-i", &source, "-map", "0:v:0", "-map", "1:a:0"]);
        } else {
            push(&mut args, &["-map", "0:v:0", "-map", "0:a:0"]);
        }

        push(&mut args, &["-c:v", &settings.video_codec]);
        push(
            &mut args,
            &["-b:v", &rate, "-minrate", &rate, "-maxrate", &rate, "-bufsize", &rate],
        );
        if settings.video_codec.ends_with("_videotoolbox") {
            push(&mut args, &["-constant_bit_rate", "1"]);
        } else if settings.video_codec == "libx264" {
            push(&mut args, &["-x264-params", "nal-hrd=cbr"]);
        }
        push(&mut args, &["-r", &settings.frame_rate.to_string()]);

        push(
            &mut args,
            &[
                "-c:a",
                &settings.audio_codec,
                "-ac",
                &settings.audio_channels.to_string(),
                "-ar",
                &settings.audio_sample_rate.to_string(),
                "-b:a",
                &settings.audio_bit_rate.to_string(),
            ],
        );
        if plan.needs_synthetic_audio {
            push(&mut args, &["-shortest"]);
        }
        push(&mut args, &["-f", "mp4"]);
        args.push(output.as_os_str().to_os_string());
        args
    }

    /// Arguments joining the clips listed in `list` into `output` by stream copy
    pub fn concat_args(&self, list: &Path, output: &Path) -> Vec<OsString> {
        let mut args = Vec::new();
        push(
            &mut args,
            &["-hide_banner", "-nostdin", "-loglevel", "error", "-y"],
        );
        push(&mut args, &["-f", "concat", "-safe", "0", "-i"]);
        args.push(list.as_os_str().to_os_string());
        push(
            &mut args,
            &["-map", "0", "-c", "copy", "-movflags", "+faststart", "-f", "mp4"],
        );
        args.push(output.as_os_str().to_os_string());
        args
    }

    /// Contents of an ffconcat list naming `inputs` in order
    pub fn concat_list(inputs: &[PathBuf]) -> String {
        let mut list = String::from("ffconcat version 1.0\n");
        for input in inputs {
            let escaped = input.to_string_lossy().replace('\'', r"'\''");
            list.push_str(&format!("file '{}'\n", escaped));
        }
        list
    }
}

#[async_trait]
impl ExecutePort for FFmpegAdapter {
    async fn transcode(&self, plan: &TranscodePlan, output: &Path) -> Result<(), DomainError> {
        debug!(
            clip = %plan.clip.path.display(),
            bit_rate = plan.target_bit_rate,
            synthetic_audio = plan.needs_synthetic_audio,
            "transcoding"
        );
        let mut command = Command::new(&self.ffmpeg_path);
        command.args(self.transcode_args(plan, output));

        run_tool(command, self.timeout)
            .await
            .map(|_| ())
            .map_err(|e| DomainError::TranscodeFailure {
                path: plan.clip.path.clone(),
                message: e.to_string(),
            })
    }

    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<(), DomainError> {
        let failure = |message: String| DomainError::ConcatenationFailure {
            output: output.to_path_buf(),
            message,
        };
        if inputs.is_empty() {
            return Err(failure("nothing to concatenate".to_string()));
        }

        let list = output
            .parent()
            .map(|dir| dir.join(CONCAT_LIST_NAME))
            .unwrap_or_else(|| PathBuf::from(CONCAT_LIST_NAME));
        tokio::fs::write(&list, Self::concat_list(inputs))
            .await
            .map_err(|e| failure(format!("failed to write concat list: {}", e)))?;

        debug!(output = %output.display(), inputs = inputs.len(), "concatenating");
        let mut command = Command::new(&self.ffmpeg_path);
        command.args(self.concat_args(&list, output));

        let result = run_tool(command, self.timeout).await;
        // The list only matters for this one invocation.
        let _ = tokio::fs::remove_file(&list).await;
        result.map(|_| ()).map_err(|e| failure(e.to_string()))
    }
}
