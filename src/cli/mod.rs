//! CLI module for dashmerge
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::Parser;

pub mod args;
pub mod commands;

pub use args::MergeArgs;

/// Dashcam clip merger
///
/// Groups one-minute dashcam clips by hour and camera and joins each group
/// into a single file with uniform encoding.
#[derive(Parser, Debug)]
#[command(name = "dashmerge")]
#[command(about = "Merge dashcam clips into hourly per-camera files")]
#[command(version)]
pub struct Cli {
    /// Directory holding the dashcam clips
    #[arg(value_name = "SRC_DIR")]
    pub src_dir: PathBuf,

    /// Directory receiving the merged files (created if absent)
    #[arg(value_name = "DST_DIR")]
    pub dst_dir: PathBuf,

    #[command(flatten)]
    pub options: MergeArgs,
}
