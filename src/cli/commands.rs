//! Command implementations

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::app::{AppContainer, DefaultAppContainer, MergeRequest};
use crate::cli::Cli;
use crate::config_initialization::initialize_configuration_hierarchy;
use crate::domain::model::{GroupOutcome, GroupReport, RunSummary};
use crate::utils::logging::{LoggingConfig, LoggingSystem};
use crate::utils::Utils;

/// Exit status after Ctrl-C
const INTERRUPTED_EXIT: u8 = 130;

/// Execute the merge command
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let cwd = std::env::current_dir().context("Failed to determine working directory")?;
    let (config, report) = initialize_configuration_hierarchy(&cli.options, &cwd)?;

    let logging = LoggingConfig::from_strings(&config.log_level, &config.log_format)?;
    if let Err(e) = LoggingSystem::new(logging).initialize() {
        eprintln!("warning: logging unavailable: {}", e);
    }
    report.log();

    let container = DefaultAppContainer::new(&config).context("Failed to set up adapters")?;
    let interactor = container.merge_interactor();
    let request = MergeRequest {
        source_dir: cli.src_dir,
        destination_dir: cli.dst_dir,
        recursive: config.recursive,
        layout: config.layout,
        overwrite: config.overwrite,
        dry_run: cli.options.dry_run,
    };

    let summary = tokio::select! {
        result = interactor.execute(request) => result.context("Merge run failed")?,
        _ = tokio::signal::ctrl_c() => {
            // Dropping the run aborts group tasks, kills their ffmpeg
            // children and removes staging directories.
            warn!("Interrupted, cancelling in-flight work");
            return Ok(ExitCode::from(INTERRUPTED_EXIT));
        }
    };

    print_summary(&summary, cli.options.json)?;

    if summary.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        info!("All groups completed");
        Ok(ExitCode::SUCCESS)
    }
}

/// Print the end-of-run summary
///
/// Results go to stdout; failed groups are repeated on stderr so they stay
/// visible when stdout is redirected.
pub fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        let rendered = serde_json::to_string_pretty(summary)
            .context("Failed to serialize run summary to JSON")?;
        println!("{}", rendered);
    } else {
        for group in &summary.groups {
            println!("{}", format_group(group));
            if let GroupOutcome::Planned { plan, .. } = &group.outcome {
                for clip in plan {
                    let marker = if clip.synthetic_audio { "  [+silent audio]" } else { "" };
                    println!("    {}{}", clip.file.display(), marker);
                }
            }
        }
        println!("{}", format_totals(summary));
    }

    for group in &summary.groups {
        if let GroupOutcome::Failed { kind, message } = &group.outcome {
            eprintln!("failed: {} ({}): {}", group.key, kind, message);
        }
    }
    Ok(())
}

fn format_group(group: &GroupReport) -> String {
    let target = group.output.display();
    match &group.outcome {
        GroupOutcome::Merged {
            target_bit_rate,
            synthetic_audio_clips,
            elapsed_ms,
        } => format!(
            "merged   {} -> {} ({} clips, {}, {} with silent audio, {})",
            group.key,
            target,
            group.clips,
            Utils::format_bit_rate(*target_bit_rate),
            synthetic_audio_clips,
            Utils::format_duration(Duration::from_millis(*elapsed_ms))
        ),
        GroupOutcome::Planned {
            target_bit_rate,
            plan,
            ..
        } => format!(
            "planned  {} -> {} ({} of {} clips usable, {})",
            group.key,
            target,
            plan.len(),
            group.clips,
            Utils::format_bit_rate(*target_bit_rate)
        ),
        GroupOutcome::SkippedExisting => {
            format!("skipped  {} -> {} (output exists)", group.key, target)
        }
        GroupOutcome::Failed { kind, .. } => {
            format!("failed   {} -> {} ({})", group.key, target, kind)
        }
    }
}

fn format_totals(summary: &RunSummary) -> String {
    format!(
        "{} merged, {} planned, {} skipped, {} failed; {} unrecognized files, {} clips excluded after probe",
        summary.merged_count(),
        summary.planned_count(),
        summary.skipped_count(),
        summary.failed_count(),
        summary.unrecognized_files,
        summary.probe_failures
    )
}
