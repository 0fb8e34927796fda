// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Camera that recorded a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Camera {
    Front,
    Back,
}

impl Camera {
    /// Resolve the camera from the trailing filename tag (`F`, `NF`, `ER`, ...)
    ///
    /// Only the last letter matters; the leading letters encode the
    /// recording mode (normal, event, parking, manual) and are ignored.
    pub fn from_tag(tag: &str) -> Option<Self> {
        if tag.is_empty() || !tag.bytes().all(|b| b.is_ascii_alphabetic()) {
            return None;
        }
        match tag.chars().last()?.to_ascii_uppercase() {
            'F' => Some(Camera::Front),
            'R' | 'B' => Some(Camera::Back),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Camera::Front => "front",
            Camera::Back => "back",
        }
    }
}

impl fmt::Display for Camera {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dashcam clip found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipDescriptor {
    pub path: PathBuf,
    pub captured_at: NaiveDateTime,
    pub camera: Camera,
}

impl ClipDescriptor {
    /// Parse a clip path following the dashcam naming convention
    ///
    /// Two spellings are recognized:
    /// - `YYYYMMDD_HHMMSS_<tag>.mp4` (e.g. `20240813_091545_NF.mp4`)
    /// - `YYYY_MMDD_HHMMSS_<tag>.mp4` (e.g. `2024_0101_140000_F.mp4`)
    pub fn parse(path: &Path) -> Result<Self, DomainError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let unrecognized = || DomainError::UnrecognizedFilenameFormat { name: name.clone() };

        let (stem, extension) = name.rsplit_once('.').ok_or_else(unrecognized)?;
        if !extension.eq_ignore_ascii_case("mp4") {
            return Err(unrecognized());
        }

        let parts: Vec<&str> = stem.split('_').collect();
        let (date, time, tag) = match parts.as_slice() {
            [date, time, tag] => (date.to_string(), *time, *tag),
            [year, month_day, time, tag] if year.len() == 4 && month_day.len() == 4 => {
                (format!("{}{}", year, month_day), *time, *tag)
            }
            _ => return Err(unrecognized()),
        };

        let captured_at = parse_timestamp(&date, time).ok_or_else(unrecognized)?;
        let camera = Camera::from_tag(tag).ok_or_else(unrecognized)?;

        Ok(Self {
            path: path.to_path_buf(),
            captured_at,
            camera,
        })
    }

    /// File name used as the ordering tie-break between equal timestamps
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Canonical `YYYY-MM-DD HH:MM:SS camera` rendering
    pub fn display(&self) -> String {
        format!("{} {}", self.captured_at.format("%Y-%m-%d %H:%M:%S"), self.camera)
    }

    /// Key of the group this clip belongs to
    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            date: self.captured_at.date(),
            hour: self.captured_at.hour(),
            camera: self.camera,
        }
    }
}

fn parse_timestamp(date: &str, time: &str) -> Option<NaiveDateTime> {
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if date.len() != 8 || time.len() != 6 || !all_digits(date) || !all_digits(time) {
        return None;
    }
    let year = date[0..4].parse::<i32>().ok()?;
    let month = date[4..6].parse::<u32>().ok()?;
    let day = date[6..8].parse::<u32>().ok()?;
    let hour = time[0..2].parse::<u32>().ok()?;
    let minute = time[2..4].parse::<u32>().ok()?;
    let second = time[4..6].parse::<u32>().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)
}

/// Hour bucket and camera shared by every clip of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupKey {
    pub date: NaiveDate,
    pub hour: u32,
    pub camera: Camera,
}

impl GroupKey {
    /// Compact identifier, unique per group (`20240101-14-front`)
    pub fn slug(&self) -> String {
        format!("{}-{:02}-{}", self.date.format("%Y%m%d"), self.hour, self.camera)
    }

    /// Output location relative to the destination directory
    pub fn output_relative_path(&self, layout: OutputLayout) -> PathBuf {
        let day = self.date.format("%Y%m%d").to_string();
        match layout {
            OutputLayout::Nested => PathBuf::from(&day)
                .join(self.camera.as_str())
                .join(format!("{}-{:02}.mp4", day, self.hour)),
            OutputLayout::Flat => PathBuf::from(format!("{}.mp4", self.slug())),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}:00 {}", self.date.format("%Y-%m-%d"), self.hour, self.camera)
    }
}

/// How merged files are arranged under the destination directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputLayout {
    /// `<day>/<camera>/<day>-<hour>.mp4`
    #[default]
    Nested,
    /// `<day>-<hour>-<camera>.mp4`
    Flat,
}

impl OutputLayout {
    /// Parse layout from string
    pub fn parse(layout_str: &str) -> Result<Self, DomainError> {
        match layout_str.to_lowercase().as_str() {
            "nested" => Ok(OutputLayout::Nested),
            "flat" => Ok(OutputLayout::Flat),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid output layout: {}. Valid layouts: nested, flat",
                layout_str
            ))),
        }
    }
}

/// Clips sharing one hour and camera, in recording order
#[derive(Debug, Clone, PartialEq)]
pub struct ClipGroup {
    pub key: GroupKey,
    pub clips: Vec<ClipDescriptor>,
}

/// What the external inspector reports about a media file
#[derive(Debug, Clone, PartialEq)]
pub struct MediaProbe {
    /// Video bit rate in bits per second
    pub bit_rate: u64,
    pub has_audio: bool,
    /// Video duration in seconds, when known
    pub duration_secs: Option<f64>,
}

/// Probe result attached to a clip for the duration of one group's processing
#[derive(Debug, Clone, PartialEq)]
pub struct ClipProbeInfo {
    pub clip: ClipDescriptor,
    pub bit_rate: u64,
    pub has_audio: bool,
    pub duration_secs: Option<f64>,
}

impl ClipProbeInfo {
    pub fn new(clip: ClipDescriptor, probe: MediaProbe) -> Self {
        Self {
            clip,
            bit_rate: probe.bit_rate,
            has_audio: probe.has_audio,
            duration_secs: probe.duration_secs,
        }
    }
}

/// Per-clip re-encode instructions
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodePlan {
    pub clip: ClipDescriptor,
    pub target_bit_rate: u64,
    pub needs_synthetic_audio: bool,
    pub duration_secs: Option<f64>,
}

/// Output parameters every intermediate clip of a run is encoded with
///
/// Only the video bit rate varies per group; everything else is fixed so
/// that intermediates can be joined by stream copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingSettings {
    pub video_codec: String,
    pub frame_rate: u32,
    pub audio_codec: String,
    /// Audio bit rate in bits per second
    pub audio_bit_rate: u64,
    pub audio_sample_rate: u32,
    pub audio_channels: u32,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            frame_rate: 30,
            audio_codec: "aac".to_string(),
            audio_bit_rate: 16_000,
            audio_sample_rate: 16_000,
            audio_channels: 1,
        }
    }
}

impl EncodingSettings {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.video_codec.trim().is_empty() {
            return Err(DomainError::Config("video_codec cannot be empty".to_string()));
        }
        if self.audio_codec.trim().is_empty() {
            return Err(DomainError::Config("audio_codec cannot be empty".to_string()));
        }
        if self.frame_rate == 0 || self.frame_rate > 240 {
            return Err(DomainError::Config(format!(
                "frame_rate must be between 1 and 240, got {}",
                self.frame_rate
            )));
        }
        if self.audio_bit_rate == 0 || self.audio_sample_rate == 0 {
            return Err(DomainError::Config(
                "audio_bit_rate and audio_sample_rate must be positive".to_string(),
            ));
        }
        if !(1..=2).contains(&self.audio_channels) {
            return Err(DomainError::Config(format!(
                "audio_channels must be 1 or 2, got {}",
                self.audio_channels
            )));
        }
        Ok(())
    }

    /// ffmpeg channel layout name matching `audio_channels`
    pub fn channel_layout(&self) -> &'static str {
        if self.audio_channels == 2 {
            "stereo"
        } else {
            "mono"
        }
    }
}

/// Everything needed to produce one merged output file
#[derive(Debug, Clone, PartialEq)]
pub struct MergeJob {
    pub key: GroupKey,
    pub plans: Vec<TranscodePlan>,
    pub output_path: PathBuf,
}

impl MergeJob {
    /// Target bit rate shared by every plan of the job
    pub fn target_bit_rate(&self) -> u64 {
        self.plans.first().map(|p| p.target_bit_rate).unwrap_or(0)
    }

    /// Number of clips that get a generated silent audio track
    pub fn synthetic_audio_count(&self) -> usize {
        self.plans.iter().filter(|p| p.needs_synthetic_audio).count()
    }

    /// Dry-run view of the job's clips, in concatenation order
    pub fn planned_clips(&self) -> Vec<PlannedClip> {
        self.plans
            .iter()
            .map(|p| PlannedClip {
                file: p.clip.path.clone(),
                synthetic_audio: p.needs_synthetic_audio,
            })
            .collect()
    }
}

/// One line of a dry-run plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlannedClip {
    pub file: PathBuf,
    pub synthetic_audio: bool,
}

/// Final state of one group
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GroupOutcome {
    Merged {
        target_bit_rate: u64,
        synthetic_audio_clips: usize,
        elapsed_ms: u64,
    },
    /// Dry run: the job was planned but not executed
    Planned {
        target_bit_rate: u64,
        synthetic_audio_clips: usize,
        plan: Vec<PlannedClip>,
    },
    SkippedExisting,
    Failed {
        kind: String,
        message: String,
    },
}

impl GroupOutcome {
    pub fn failed(error: &DomainError) -> Self {
        GroupOutcome::Failed {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }
}

/// Per-group entry of the run summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub key: GroupKey,
    pub output: PathBuf,
    pub clips: usize,
    #[serde(flatten)]
    pub outcome: GroupOutcome,
}

/// Result of a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub groups: Vec<GroupReport>,
    pub unrecognized_files: usize,
    pub probe_failures: usize,
}

impl RunSummary {
    pub fn merged_count(&self) -> usize {
        self.count(|o| matches!(o, GroupOutcome::Merged { .. }))
    }

    pub fn planned_count(&self) -> usize {
        self.count(|o| matches!(o, GroupOutcome::Planned { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, GroupOutcome::SkippedExisting))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, GroupOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    fn count(&self, predicate: impl Fn(&GroupOutcome) -> bool) -> usize {
        self.groups.iter().filter(|g| predicate(&g.outcome)).count()
    }
}
