//! Dashmerge library
//!
//! Groups dashcam clips by hour and camera, re-encodes each group to a
//! uniform constant bit rate with ffmpeg and joins it into a single file.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use adapters::MergeConfig;
pub use app::{MergeInteractor, MergeRequest};
pub use domain::errors::DomainError;
pub use domain::model::{ClipDescriptor, GroupKey, GroupOutcome, OutputLayout, RunSummary};
