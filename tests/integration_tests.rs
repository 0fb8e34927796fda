use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmerge_cli::adapters::LocalFsAdapter;
use dashmerge_cli::domain::model::*;
use dashmerge_cli::ports::*;
use dashmerge_cli::*;
use tempfile::TempDir;

/// Fake ports standing in for ffprobe and ffmpeg
mod test_utils {
    use super::*;
    use async_trait::async_trait;

    /// Probe answering from a table keyed by file name; unknown names fail
    #[derive(Default)]
    pub struct FakeProbe {
        pub media: HashMap<String, MediaProbe>,
    }

    impl FakeProbe {
        pub fn with(mut self, name: &str, bit_rate: u64, has_audio: bool) -> Self {
            self.media.insert(
                name.to_string(),
                MediaProbe {
                    bit_rate,
                    has_audio,
                    duration_secs: Some(60.0),
                },
            );
            self
        }
    }

    #[async_trait]
    impl ProbePort for FakeProbe {
        async fn probe_clip(&self, file_path: &Path) -> Result<MediaProbe, DomainError> {
            let name = file_path.file_name().unwrap().to_string_lossy().into_owned();
            self.media
                .get(&name)
                .cloned()
                .ok_or_else(|| DomainError::ProbeFailure {
                    path: file_path.to_path_buf(),
                    message: "corrupt file".to_string(),
                })
        }
    }

    /// Executor writing `name|bit_rate|synthetic` lines instead of video
    ///
    /// Concatenation appends the inputs in the order given, so the merged
    /// file spells out which clips went in and how they were encoded.
    #[derive(Default)]
    pub struct FakeExecutor {
        pub fail_on: Option<String>,
        /// Write the partial output, then report a failed concatenation
        pub fail_concat: bool,
        /// Per-clip encode time, 20ms when unset
        pub transcode_delay: Option<Duration>,
        pub active: AtomicUsize,
        pub peak: AtomicUsize,
        pub transcodes: AtomicUsize,
    }

    #[async_trait]
    impl ExecutePort for FakeExecutor {
        async fn transcode(&self, plan: &TranscodePlan, output: &Path) -> Result<(), DomainError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            self.transcodes.fetch_add(1, Ordering::SeqCst);
            let delay = self.transcode_delay.unwrap_or(Duration::from_millis(20));
            tokio::time::sleep(delay).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            let name = plan.clip.file_name();
            if self.fail_on.as_deref() == Some(name.as_str()) {
                return Err(DomainError::TranscodeFailure {
                    path: plan.clip.path.clone(),
                    message: "encoder exited with status 1".to_string(),
                });
            }
            let line = format!(
                "{}|{}|{}\n",
                name, plan.target_bit_rate, plan.needs_synthetic_audio
            );
            tokio::fs::write(output, line).await.unwrap();
            Ok(())
        }

        async fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<(), DomainError> {
            let mut merged = String::new();
            for input in inputs {
                merged.push_str(&tokio::fs::read_to_string(input).await.unwrap());
            }
            tokio::fs::write(output, merged).await.unwrap();
            if self.fail_concat {
                return Err(DomainError::ConcatenationFailure {
                    output: output.to_path_buf(),
                    message: "Non-monotonous DTS in output stream".to_string(),
                });
            }
            Ok(())
        }
    }

    pub fn touch_clips(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), b"").unwrap();
        }
    }

    pub fn interactor(
        probe: FakeProbe,
        executor: Arc<FakeExecutor>,
        jobs: usize,
    ) -> MergeInteractor {
        MergeInteractor::new(
            Arc::new(probe),
            executor,
            Arc::new(LocalFsAdapter::new()),
            jobs,
            8,
        )
    }

    pub fn request(src: &TempDir, dst: &Path) -> MergeRequest {
        MergeRequest {
            source_dir: src.path().to_path_buf(),
            destination_dir: dst.to_path_buf(),
            recursive: false,
            layout: OutputLayout::Nested,
            overwrite: false,
            dry_run: false,
        }
    }

    /// Staging directories left anywhere under `dir`
    pub fn leftover_staging(dir: &Path) -> Vec<PathBuf> {
        walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".dashmerge-"))
            .map(|e| e.into_path())
            .collect()
    }

    /// Names of the entries in `dir`, sorted
    pub fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

use test_utils::*;

const FIRST: &str = "2024_0101_140000_F.mp4";
const SECOND: &str = "2024_0101_140100_F.mp4";

fn hour_14_front(dst: &Path) -> PathBuf {
    dst.join("20240101").join("front").join("20240101-14.mp4")
}

#[tokio::test]
async fn test_end_to_end_merge_normalizes_group() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    touch_clips(src.path(), &[SECOND, FIRST]);

    let probe = FakeProbe::default()
        .with(FIRST, 8_000_000, true)
        .with(SECOND, 10_000_000, false);
    let executor = Arc::new(FakeExecutor::default());
    let summary = interactor(probe, executor, 2)
        .execute(request(&src, dst.path()))
        .await
        .unwrap();

    assert_eq!(summary.groups.len(), 1);
    assert_eq!(summary.merged_count(), 1);
    assert!(!summary.has_failures());
    match &summary.groups[0].outcome {
        GroupOutcome::Merged {
            target_bit_rate,
            synthetic_audio_clips,
            ..
        } => {
            assert_eq!(*target_bit_rate, 10_000_000);
            assert_eq!(*synthetic_audio_clips, 1);
        }
        other => panic!("expected merged group, got {:?}", other),
    }

    let output = hour_14_front(dst.path());
    assert_eq!(summary.groups[0].output, output);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "2024_0101_140000_F.mp4|10000000|false\n2024_0101_140100_F.mp4|10000000|true\n"
    );
    // Staging directory is gone, only the merged file remains.
    assert_eq!(entries(output.parent().unwrap()), vec!["20240101-14.mp4"]);
}

#[tokio::test]
async fn test_probe_failure_drops_clip_but_merges_rest() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    touch_clips(src.path(), &[FIRST, SECOND]);

    let probe = FakeProbe::default().with(FIRST, 8_000_000, true);
    let executor = Arc::new(FakeExecutor::default());
    let summary = interactor(probe, executor, 2)
        .execute(request(&src, dst.path()))
        .await
        .unwrap();

    assert_eq!(summary.merged_count(), 1);
    assert_eq!(summary.probe_failures, 1);
    assert_eq!(summary.groups[0].clips, 2);
    assert_eq!(
        std::fs::read_to_string(hour_14_front(dst.path())).unwrap(),
        "2024_0101_140000_F.mp4|8000000|false\n"
    );
}

#[tokio::test]
async fn test_group_with_no_probeable_clips_fails() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    touch_clips(src.path(), &[FIRST, SECOND]);

    let executor = Arc::new(FakeExecutor::default());
    let summary = interactor(FakeProbe::default(), Arc::clone(&executor), 2)
        .execute(request(&src, dst.path()))
        .await
        .unwrap();

    assert!(summary.has_failures());
    assert_eq!(summary.probe_failures, 2);
    assert!(matches!(
        &summary.groups[0].outcome,
        GroupOutcome::Failed { kind, .. } if kind == "empty_group_after_probe"
    ));
    assert_eq!(executor.transcodes.load(Ordering::SeqCst), 0);
    assert!(!hour_14_front(dst.path()).exists());
}

#[tokio::test]
async fn test_transcode_failure_leaves_no_output_or_staging() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    touch_clips(src.path(), &[FIRST, SECOND]);

    let probe = FakeProbe::default()
        .with(FIRST, 8_000_000, true)
        .with(SECOND, 10_000_000, true);
    let executor = Arc::new(FakeExecutor {
        fail_on: Some(SECOND.to_string()),
        ..FakeExecutor::default()
    });
    let summary = interactor(probe, executor, 2)
        .execute(request(&src, dst.path()))
        .await
        .unwrap();

    assert!(summary.has_failures());
    assert!(matches!(
        &summary.groups[0].outcome,
        GroupOutcome::Failed { kind, .. } if kind == "transcode_failure"
    ));
    // Neither the output nor the day/camera directories made for it remain.
    assert!(!hour_14_front(dst.path()).exists());
    assert!(entries(dst.path()).is_empty());
}

#[tokio::test]
async fn test_concat_failure_reports_output_and_cleans_up() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    touch_clips(src.path(), &[FIRST, SECOND]);

    let media = FakeProbe::default()
        .with(FIRST, 8_000_000, true)
        .with(SECOND, 10_000_000, true);
    let executor = Arc::new(FakeExecutor {
        fail_concat: true,
        ..FakeExecutor::default()
    });
    let summary = interactor(media, Arc::clone(&executor), 2)
        .execute(request(&src, dst.path()))
        .await
        .unwrap();

    assert_eq!(executor.transcodes.load(Ordering::SeqCst), 2);
    match &summary.groups[0].outcome {
        GroupOutcome::Failed { kind, message } => {
            assert_eq!(kind, "concatenation_failure");
            assert!(message.contains(&hour_14_front(dst.path()).display().to_string()));
            assert!(!message.contains(".dashmerge-"));
        }
        other => panic!("expected failed group, got {:?}", other),
    }
    assert!(entries(dst.path()).is_empty());
}

#[tokio::test]
async fn test_commit_failure_is_a_group_failure() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    touch_clips(src.path(), &[FIRST]);

    // A non-empty directory squatting on the output path cannot be replaced.
    let output = hour_14_front(dst.path());
    std::fs::create_dir_all(&output).unwrap();
    std::fs::write(output.join("keep"), b"x").unwrap();

    let media = FakeProbe::default().with(FIRST, 8_000_000, true);
    let overwrite = MergeRequest {
        overwrite: true,
        ..request(&src, dst.path())
    };
    let summary = interactor(media, Arc::new(FakeExecutor::default()), 1)
        .execute(overwrite)
        .await
        .unwrap();

    assert!(matches!(
        &summary.groups[0].outcome,
        GroupOutcome::Failed { kind, .. } if kind == "destination_write_failure"
    ));
    assert_eq!(entries(output.parent().unwrap()), vec!["20240101-14.mp4"]);
    assert_eq!(entries(&output), vec!["keep"]);
}

#[tokio::test]
async fn test_cancelled_run_removes_staging() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    touch_clips(src.path(), &[FIRST, SECOND]);

    let media = FakeProbe::default()
        .with(FIRST, 8_000_000, true)
        .with(SECOND, 10_000_000, true);
    let executor = Arc::new(FakeExecutor {
        transcode_delay: Some(Duration::from_secs(30)),
        ..FakeExecutor::default()
    });
    let merge = interactor(media, Arc::clone(&executor), 2);

    let run = tokio::time::timeout(
        Duration::from_secs(1),
        merge.execute(request(&src, dst.path())),
    )
    .await;
    assert!(run.is_err(), "run should still be encoding");
    assert!(executor.transcodes.load(Ordering::SeqCst) > 0);

    // Aborted group tasks are dropped on the runtime's next turn.
    for _ in 0..200 {
        if leftover_staging(dst.path()).is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(leftover_staging(dst.path()), Vec::<PathBuf>::new());
    assert!(!hour_14_front(dst.path()).exists());
}

#[tokio::test]
async fn test_rerun_skips_existing_output_unless_overwrite() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    touch_clips(src.path(), &[FIRST]);
    let probe = || FakeProbe::default().with(FIRST, 8_000_000, true);

    let first = interactor(probe(), Arc::new(FakeExecutor::default()), 1)
        .execute(request(&src, dst.path()))
        .await
        .unwrap();
    assert_eq!(first.merged_count(), 1);

    let executor = Arc::new(FakeExecutor::default());
    let second = interactor(probe(), Arc::clone(&executor), 1)
        .execute(request(&src, dst.path()))
        .await
        .unwrap();
    assert_eq!(second.skipped_count(), 1);
    assert_eq!(executor.transcodes.load(Ordering::SeqCst), 0);

    let overwrite = MergeRequest {
        overwrite: true,
        ..request(&src, dst.path())
    };
    let third = interactor(probe(), Arc::new(FakeExecutor::default()), 1)
        .execute(overwrite)
        .await
        .unwrap();
    assert_eq!(third.merged_count(), 1);
    assert_eq!(
        entries(hour_14_front(dst.path()).parent().unwrap()),
        vec!["20240101-14.mp4"]
    );
}

#[tokio::test]
async fn test_groups_split_by_hour_and_camera() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    let names = [
        FIRST,
        "2024_0101_140000_R.mp4",
        "20240101_150500_NF.mp4",
        "notes.txt",
    ];
    touch_clips(src.path(), &names);

    let probe = names[..3]
        .iter()
        .fold(FakeProbe::default(), |p, n| p.with(n, 5_000_000, true));
    let summary = interactor(probe, Arc::new(FakeExecutor::default()), 4)
        .execute(request(&src, dst.path()))
        .await
        .unwrap();

    assert_eq!(summary.unrecognized_files, 1);
    assert_eq!(summary.merged_count(), 3);
    let outputs: Vec<PathBuf> = summary.groups.iter().map(|g| g.output.clone()).collect();
    assert_eq!(
        outputs,
        vec![
            dst.path().join("20240101/front/20240101-14.mp4"),
            dst.path().join("20240101/back/20240101-14.mp4"),
            dst.path().join("20240101/front/20240101-15.mp4"),
        ]
    );
    assert!(outputs.iter().all(|o| o.is_file()));
}

#[tokio::test]
async fn test_dry_run_plans_without_writing() {
    let src = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let dst = scratch.path().join("not-created");
    touch_clips(src.path(), &[FIRST, SECOND]);

    let probe = FakeProbe::default()
        .with(FIRST, 8_000_000, true)
        .with(SECOND, 10_000_000, false);
    let executor = Arc::new(FakeExecutor::default());
    let dry_run = MergeRequest {
        dry_run: true,
        ..request(&src, &dst)
    };
    let summary = interactor(probe, Arc::clone(&executor), 2)
        .execute(dry_run)
        .await
        .unwrap();

    assert_eq!(summary.planned_count(), 1);
    match &summary.groups[0].outcome {
        GroupOutcome::Planned {
            target_bit_rate,
            plan,
            ..
        } => {
            assert_eq!(*target_bit_rate, 10_000_000);
            let flags: Vec<bool> = plan.iter().map(|c| c.synthetic_audio).collect();
            assert_eq!(flags, vec![false, true]);
            assert_eq!(plan[0].file, src.path().join(FIRST));
        }
        other => panic!("expected planned group, got {:?}", other),
    }
    assert_eq!(executor.transcodes.load(Ordering::SeqCst), 0);
    assert!(!dst.exists());
}

#[tokio::test]
async fn test_flat_layout_output_name() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    touch_clips(src.path(), &["20240813_091545_ER.mp4"]);

    let probe = FakeProbe::default().with("20240813_091545_ER.mp4", 6_000_000, false);
    let flat = MergeRequest {
        layout: OutputLayout::Flat,
        ..request(&src, dst.path())
    };
    let summary = interactor(probe, Arc::new(FakeExecutor::default()), 1)
        .execute(flat)
        .await
        .unwrap();

    assert_eq!(summary.merged_count(), 1);
    let output = dst.path().join("20240813-09-back.mp4");
    assert_eq!(
        std::fs::read_to_string(output).unwrap(),
        "20240813_091545_ER.mp4|6000000|true\n"
    );
    assert_eq!(entries(dst.path()), vec!["20240813-09-back.mp4"]);
}

#[tokio::test]
async fn test_encode_pool_bounds_concurrent_transcodes() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    let names = [
        "2024_0101_140000_F.mp4",
        "2024_0101_140100_F.mp4",
        "2024_0101_150000_F.mp4",
        "2024_0101_160000_R.mp4",
    ];
    touch_clips(src.path(), &names);

    let probe = names
        .iter()
        .fold(FakeProbe::default(), |p, n| p.with(n, 4_000_000, true));
    let executor = Arc::new(FakeExecutor::default());
    let summary = interactor(probe, Arc::clone(&executor), 2)
        .execute(request(&src, dst.path()))
        .await
        .unwrap();

    assert_eq!(summary.merged_count(), 3);
    assert_eq!(executor.transcodes.load(Ordering::SeqCst), 4);
    assert!(executor.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_missing_source_directory_is_fatal() {
    let scratch = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    let request = MergeRequest {
        source_dir: scratch.path().join("absent"),
        ..request(&scratch, dst.path())
    };
    let result = interactor(FakeProbe::default(), Arc::new(FakeExecutor::default()), 1)
        .execute(request)
        .await;
    assert!(matches!(result, Err(DomainError::BadArgs(_))));
}

#[tokio::test]
async fn test_unwritable_destination_is_fatal() {
    let src = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let blocker = scratch.path().join("file");
    std::fs::write(&blocker, b"x").unwrap();
    touch_clips(src.path(), &[FIRST]);

    let probe = FakeProbe::default().with(FIRST, 8_000_000, true);
    let result = interactor(probe, Arc::new(FakeExecutor::default()), 1)
        .execute(request(&src, &blocker.join("out")))
        .await;
    assert!(matches!(
        result,
        Err(DomainError::DestinationWriteFailure { .. })
    ));
}
