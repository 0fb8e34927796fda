// Domain errors - Error types for the domain layer

use std::path::PathBuf;
use thiserror::Error;

/// Domain-specific error types
///
/// Each variant carries its own failure domain: file-level errors skip a
/// single file, clip-level errors drop one clip from its group, and
/// group-level errors fail only the group they were raised for.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// File name does not follow the dashcam naming convention
    #[error("Unrecognized filename format: {name}")]
    UnrecognizedFilenameFormat { name: String },

    /// External inspection could not read the clip
    #[error("Failed to probe {}: {message}", path.display())]
    ProbeFailure { path: PathBuf, message: String },

    /// Every clip of a group was rejected by the probe stage
    #[error("No usable clips left in group {group}")]
    EmptyGroupAfterProbe { group: String },

    /// Re-encoding a single clip failed
    #[error("Failed to transcode {}: {message}", path.display())]
    TranscodeFailure { path: PathBuf, message: String },

    /// Stream-copy concatenation of a group failed
    #[error("Failed to concatenate into {}: {message}", output.display())]
    ConcatenationFailure { output: PathBuf, message: String },

    /// Destination could not be created or written
    #[error("Cannot write to {}: {message}", path.display())]
    DestinationWriteFailure { path: PathBuf, message: String },

    /// Invalid arguments provided
    #[error("Bad arguments: {0}")]
    BadArgs(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DomainError {
    /// Short machine-friendly name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::UnrecognizedFilenameFormat { .. } => "unrecognized_filename_format",
            DomainError::ProbeFailure { .. } => "probe_failure",
            DomainError::EmptyGroupAfterProbe { .. } => "empty_group_after_probe",
            DomainError::TranscodeFailure { .. } => "transcode_failure",
            DomainError::ConcatenationFailure { .. } => "concatenation_failure",
            DomainError::DestinationWriteFailure { .. } => "destination_write_failure",
            DomainError::BadArgs(_) => "bad_args",
            DomainError::Config(_) => "config",
        }
    }
}
