// Domain rules - Grouping and normalization policies
//
// Everything here is pure: no I/O, deterministic for a given input.

use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Business rules for bucketing clips into hourly per-camera groups
pub struct ClipGrouper;

impl ClipGrouper {
    /// Partition clips by `(hour, camera)`
    ///
    /// Groups come back in ascending key order. Inside a group clips are
    /// sorted by capture time; clips sharing a timestamp are ordered by file
    /// name and then by full path, so the result never depends on the order
    /// the directory listing produced.
    pub fn group(clips: Vec<ClipDescriptor>) -> Vec<ClipGroup> {
        let mut buckets: BTreeMap<GroupKey, Vec<ClipDescriptor>> = BTreeMap::new();
        for clip in clips {
            buckets.entry(clip.group_key()).or_default().push(clip);
        }

        buckets
            .into_iter()
            .map(|(key, mut clips)| {
                clips.sort_by(|a, b| {
                    a.captured_at
                        .cmp(&b.captured_at)
                        .then_with(|| a.file_name().cmp(&b.file_name()))
                        .then_with(|| a.path.cmp(&b.path))
                });
                ClipGroup { key, clips }
            })
            .collect()
    }
}

/// Business rules for choosing a common encoding across a group
pub struct Normalizer;

impl Normalizer {
    /// Highest probed bit rate of the group
    pub fn target_bit_rate(probes: &[ClipProbeInfo]) -> Option<u64> {
        probes.iter().map(|p| p.bit_rate).max()
    }

    /// Build the per-clip transcode plans of a group, preserving clip order
    pub fn plan_group(
        key: &GroupKey,
        probes: &[ClipProbeInfo],
    ) -> Result<Vec<TranscodePlan>, DomainError> {
        let target_bit_rate =
            Self::target_bit_rate(probes).ok_or_else(|| DomainError::EmptyGroupAfterProbe {
                group: key.to_string(),
            })?;

        Ok(probes
            .iter()
            .map(|probe| TranscodePlan {
                clip: probe.clip.clone(),
                target_bit_rate,
                needs_synthetic_audio: !probe.has_audio,
                duration_secs: probe.duration_secs,
            })
            .collect())
    }

    /// Assemble the merge job for a group written under `destination`
    pub fn merge_job(
        key: GroupKey,
        probes: &[ClipProbeInfo],
        destination: &Path,
        layout: OutputLayout,
    ) -> Result<MergeJob, DomainError> {
        let plans = Self::plan_group(&key, probes)?;
        Ok(MergeJob {
            key,
            plans,
            output_path: destination.join(key.output_relative_path(layout)),
        })
    }
}
