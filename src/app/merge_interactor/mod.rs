// Merge interactor - Orchestrates the scan, probe, normalize and merge pipeline

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::app::scan_interactor::ScanInteractor;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::domain::rules::*;
use crate::ports::*;

/// Name of the concatenation target inside a group's staging directory
pub const PARTIAL_OUTPUT_NAME: &str = "output.partial.mp4";

/// Merge request parameters
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub source_dir: PathBuf,
    pub destination_dir: PathBuf,
    pub recursive: bool,
    pub layout: OutputLayout,
    pub overwrite: bool,
    pub dry_run: bool,
}

impl MergeRequest {
    fn output_path(&self, key: &GroupKey) -> PathBuf {
        self.destination_dir.join(key.output_relative_path(self.layout))
    }
}

/// Result of one group task
struct GroupRun {
    report: GroupReport,
    probe_failures: usize,
}

/// Interactor for the merge use case
#[derive(Clone)]
pub struct MergeInteractor {
    scanner: Arc<ScanInteractor>,
    probe_port: Arc<dyn ProbePort>,
    execute_port: Arc<dyn ExecutePort>,
    fs_port: Arc<dyn FsPort>,
    encode_slots: Arc<Semaphore>,
    probe_slots: Arc<Semaphore>,
}

impl MergeInteractor {
    /// Create new merge interactor with injected ports
    ///
    /// `jobs` bounds concurrent transcodes across all groups and
    /// `probe_jobs` bounds concurrent probes.
    pub fn new(
        probe_port: Arc<dyn ProbePort>,
        execute_port: Arc<dyn ExecutePort>,
        fs_port: Arc<dyn FsPort>,
        jobs: usize,
        probe_jobs: usize,
    ) -> Self {
        Self {
            scanner: Arc::new(ScanInteractor::new(Arc::clone(&fs_port))),
            probe_port,
            execute_port,
            fs_port,
            encode_slots: Arc::new(Semaphore::new(jobs.max(1))),
            probe_slots: Arc::new(Semaphore::new(probe_jobs.max(1))),
        }
    }

    /// Run the whole pipeline for one source/destination pair
    ///
    /// Per-group failures are recorded in the summary; only an unreadable
    /// source or an unusable destination root fail the run as a whole.
    pub async fn execute(&self, request: MergeRequest) -> Result<RunSummary, DomainError> {
        info!(
            source = %request.source_dir.display(),
            destination = %request.destination_dir.display(),
            dry_run = request.dry_run,
            "Starting merge run"
        );

        let scan = self
            .scanner
            .scan(&request.source_dir, request.recursive)
            .await?;
        if !request.dry_run {
            self.fs_port
                .ensure_destination(&request.destination_dir)
                .await?;
        }

        let groups = ClipGrouper::group(scan.clips);
        info!(groups = groups.len(), "Grouped clips by hour and camera");

        let request = Arc::new(request);
        let mut pending: BTreeMap<GroupKey, (PathBuf, usize)> = BTreeMap::new();
        let mut tasks = JoinSet::new();
        for group in groups {
            pending.insert(group.key, (request.output_path(&group.key), group.clips.len()));
            let span = info_span!("group", group = %group.key);
            let this = self.clone();
            let request = Arc::clone(&request);
            tasks.spawn(async move { this.process_group(group, &request).await }.instrument(span));
        }

        let mut summary = RunSummary {
            unrecognized_files: scan.unrecognized.len(),
            ..RunSummary::default()
        };
        let mut lost_tasks = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(run) => {
                    pending.remove(&run.report.key);
                    summary.probe_failures += run.probe_failures;
                    summary.groups.push(run.report);
                }
                Err(e) => {
                    error!("Group task did not complete: {}", e);
                    lost_tasks.push(e.to_string());
                }
            }
        }

        // Whatever is still pending belongs to a task that panicked.
        let message = lost_tasks.join("; ");
        for (key, (output, clips)) in pending {
            summary.groups.push(GroupReport {
                key,
                output,
                clips,
                outcome: GroupOutcome::Failed {
                    kind: "task_aborted".to_string(),
                    message: message.clone(),
                },
            });
        }

        summary.groups.sort_by_key(|g| g.key);
        info!(
            merged = summary.merged_count(),
            planned = summary.planned_count(),
            skipped = summary.skipped_count(),
            failed = summary.failed_count(),
            "Merge run finished"
        );
        Ok(summary)
    }

    async fn process_group(&self, group: ClipGroup, request: &MergeRequest) -> GroupRun {
        let key = group.key;
        let output = request.output_path(&key);
        let clips = group.clips.len();
        let report = |outcome| GroupReport {
            key,
            output: output.clone(),
            clips,
            outcome,
        };

        if !request.overwrite && self.fs_port.file_exists(&output).await {
            info!(output = %output.display(), "Output exists, skipping group");
            return GroupRun {
                report: report(GroupOutcome::SkippedExisting),
                probe_failures: 0,
            };
        }

        let (probes, probe_failures) = self.probe_group(&group).await;
        let job = match Normalizer::merge_job(key, &probes, &request.destination_dir, request.layout)
        {
            Ok(job) => job,
            Err(e) => {
                warn!("{}", e);
                return GroupRun {
                    report: report(GroupOutcome::failed(&e)),
                    probe_failures,
                };
            }
        };

        let outcome = if request.dry_run {
            info!(
                output = %job.output_path.display(),
                bit_rate = job.target_bit_rate(),
                clips = job.plans.len(),
                "Planned merge"
            );
            GroupOutcome::Planned {
                target_bit_rate: job.target_bit_rate(),
                synthetic_audio_clips: job.synthetic_audio_count(),
                plan: job.planned_clips(),
            }
        } else {
            let started = Instant::now();
            match self.execute_job(&job, &request.destination_dir).await {
                Ok(()) => {
                    let elapsed_ms = started.elapsed().as_millis() as u64;
                    info!(
                        output = %job.output_path.display(),
                        bit_rate = job.target_bit_rate(),
                        clips = job.plans.len(),
                        elapsed_ms,
                        "Merged group"
                    );
                    GroupOutcome::Merged {
                        target_bit_rate: job.target_bit_rate(),
                        synthetic_audio_clips: job.synthetic_audio_count(),
                        elapsed_ms,
                    }
                }
                Err(e) => {
                    error!("Group failed: {}", e);
                    GroupOutcome::failed(&e)
                }
            }
        };

        GroupRun {
            report: report(outcome),
            probe_failures,
        }
    }

    /// Probe every clip of a group, keeping the ones that answered
    ///
    /// Returns the usable probes in clip order and the number of clips
    /// that were dropped.
    async fn probe_group(&self, group: &ClipGroup) -> (Vec<ClipProbeInfo>, usize) {
        let mut probes = JoinSet::new();
        for (index, clip) in group.clips.iter().cloned().enumerate() {
            let port = Arc::clone(&self.probe_port);
            let slots = Arc::clone(&self.probe_slots);
            probes.spawn(async move {
                let result = match slots.acquire_owned().await {
                    Ok(_permit) => port.probe_clip(&clip.path).await,
                    Err(e) => Err(DomainError::ProbeFailure {
                        path: clip.path.clone(),
                        message: e.to_string(),
                    }),
                };
                (index, clip, result)
            });
        }

        let mut usable = Vec::with_capacity(group.clips.len());
        let mut failures = 0;
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok((index, clip, Ok(probe))) => usable.push((index, ClipProbeInfo::new(clip, probe))),
                Ok((_, clip, Err(e))) => {
                    warn!(clip = %clip.path.display(), "Excluding clip: {}", e);
                    failures += 1;
                }
                Err(e) => {
                    warn!("Probe task did not complete: {}", e);
                    failures += 1;
                }
            }
        }

        usable.sort_by_key(|(index, _)| *index);
        (usable.into_iter().map(|(_, info)| info).collect(), failures)
    }

    /// Produce `job.output_path`, or leave the destination untouched on failure
    async fn execute_job(&self, job: &MergeJob, destination: &Path) -> Result<(), DomainError> {
        let staging = self
            .fs_port
            .create_staging_dir(&job.output_path, &job.key)
            .await?;
        debug!(staging = %staging.path().display(), "Created staging directory");

        let result = self.merge_in(job, staging.path()).await;

        let staging_path = staging.path().to_path_buf();
        if let Err(e) = staging.close() {
            warn!(staging = %staging_path.display(), "Failed to remove staging directory: {}", e);
        }
        if result.is_err() {
            if let Some(parent) = job.output_path.parent() {
                self.fs_port.prune_empty_dirs(parent, destination).await;
            }
        }
        result
    }

    async fn merge_in(&self, job: &MergeJob, staging: &Path) -> Result<(), DomainError> {
        let mut transcodes = JoinSet::new();
        for (index, plan) in job.plans.iter().cloned().enumerate() {
            let target = staging.join(format!("{:04}.mp4", index));
            let port = Arc::clone(&self.execute_port);
            let slots = Arc::clone(&self.encode_slots);
            transcodes.spawn(async move {
                let _permit =
                    slots
                        .acquire_owned()
                        .await
                        .map_err(|e| DomainError::TranscodeFailure {
                            path: plan.clip.path.clone(),
                            message: e.to_string(),
                        })?;
                port.transcode(&plan, &target).await?;
                Ok::<_, DomainError>((index, target))
            });
        }

        let mut parts = Vec::with_capacity(job.plans.len());
        while let Some(joined) = transcodes.join_next().await {
            let part = joined
                .map_err(|e| DomainError::TranscodeFailure {
                    path: job.output_path.clone(),
                    message: format!("transcode task did not complete: {}", e),
                })
                .and_then(|result| result);
            match part {
                Ok(part) => parts.push(part),
                Err(e) => {
                    // Cancel the siblings; their children are killed on drop.
                    transcodes.shutdown().await;
                    return Err(e);
                }
            }
        }

        parts.sort_by_key(|(index, _)| *index);
        let inputs: Vec<PathBuf> = parts.into_iter().map(|(_, path)| path).collect();

        let partial = staging.join(PARTIAL_OUTPUT_NAME);
        self.execute_port
            .concat(&inputs, &partial)
            .await
            .map_err(|e| match e {
                // Report the file the user asked for, not the staging path.
                DomainError::ConcatenationFailure { message, .. } => {
                    DomainError::ConcatenationFailure {
                        output: job.output_path.clone(),
                        message,
                    }
                }
                other => other,
            })?;
        self.fs_port.commit(&partial, &job.output_path).await
    }
}
