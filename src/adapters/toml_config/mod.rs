// TOML config adapter - Configuration file loading and validation

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::errors::*;
use crate::domain::model::*;

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "dashmerge.toml";

/// Settings for one merge run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MergeConfig {
    /// Walk subdirectories of the source directory
    pub recursive: bool,
    /// Concurrent transcodes
    pub jobs: usize,
    /// Concurrent probes
    pub probe_jobs: usize,
    pub layout: OutputLayout,
    /// Re-merge groups whose output already exists
    pub overwrite: bool,
    /// Ceiling for any single ffmpeg/ffprobe invocation
    pub timeout_secs: u64,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub encoding: EncodingSettings,
    pub log_level: String,
    pub log_format: String,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            recursive: false,
            jobs: num_cpus::get().max(1),
            probe_jobs: 8,
            layout: OutputLayout::Nested,
            overwrite: false,
            timeout_secs: 1800,
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            encoding: EncodingSettings::default(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl MergeConfig {
    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.jobs == 0 {
            return Err(DomainError::Config("jobs must be at least 1".to_string()));
        }
        if self.probe_jobs == 0 {
            return Err(DomainError::Config("probe_jobs must be at least 1".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(DomainError::Config("timeout_secs must be positive".to_string()));
        }
        if self.ffmpeg_path.trim().is_empty() || self.ffprobe_path.trim().is_empty() {
            return Err(DomainError::Config(
                "ffmpeg_path and ffprobe_path cannot be empty".to_string(),
            ));
        }
        self.encoding.validate()
    }
}

/// Reads `MergeConfig` from TOML or YAML files
pub struct TomlConfigAdapter;

impl TomlConfigAdapter {
    /// Load a config file, choosing the parser from its extension
    pub fn load(file_path: &Path) -> Result<MergeConfig, DomainError> {
        let content = std::fs::read_to_string(file_path).map_err(|e| {
            DomainError::Config(format!(
                "Failed to read config file {}: {}",
                file_path.display(),
                e
            ))
        })?;

        let is_yaml = file_path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
            .unwrap_or(false);

        if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    pub fn from_toml_str(content: &str) -> Result<MergeConfig, DomainError> {
        toml::from_str(content)
            .map_err(|e| DomainError::Config(format!("Failed to parse TOML config: {}", e)))
    }

    pub fn from_yaml_str(content: &str) -> Result<MergeConfig, DomainError> {
        // An empty YAML document means "all defaults".
        if content.trim().is_empty() {
            return Ok(MergeConfig::default());
        }
        serde_yaml::from_str(content)
            .map_err(|e| DomainError::Config(format!("Failed to parse YAML config: {}", e)))
    }

    /// Config file to use: the explicit one, else the default in `cwd` if present
    pub fn locate(explicit: Option<&Path>, cwd: &Path) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let candidate = cwd.join(DEFAULT_CONFIG_FILE);
                candidate.is_file().then_some(candidate)
            }
        }
    }
}
