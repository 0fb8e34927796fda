//! dashmerge
//!
//! Merges one-minute dashcam clips into one file per hour and camera.
//!
//! # Features
//!
//! - Recognizes BlackVue-style and split-date clip names
//! - Normalizes every clip of a group to the group's highest bit rate
//! - Adds silent audio to clips recorded without sound
//! - Bounded parallel transcoding, atomic output commits, resumable reruns
//!
//! # Usage
//!
//! ```bash
//! dashmerge /Volumes/BLACKVUE/Record ~/Movies/dashcam
//! dashmerge --dry-run --layout flat /media/card /media/out
//! ```

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use dashmerge_cli::cli::{commands, Cli};

/// Main entry point for the dashmerge CLI
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    commands::run(cli).await
}
