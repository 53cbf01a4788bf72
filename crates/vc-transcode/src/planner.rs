//! The missing-variant planner.
//!
//! For every title in a catalog snapshot, the candidate set is
//! `Container::ALL x Resolution::up_to(best source resolution)`; whatever
//! the catalog already holds is subtracted and the rest become jobs. The
//! planner is re-entrant: planning over a complete catalog yields nothing.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use vc_core::filename::compose_filename;
use vc_core::{Container, JobId, Resolution, VideoEntry};

use crate::job::TranscodeJob;

/// Compute the jobs needed to complete every title in `snapshot`.
///
/// The source for a title is its highest-resolution entry, ties broken by
/// container table order. Targets land in `video_dir` under the canonical
/// file name.
pub fn plan(snapshot: &[VideoEntry], video_dir: &Path) -> Vec<TranscodeJob> {
    // Group by title; BTreeMap keeps job emission deterministic.
    let mut by_title: BTreeMap<&str, Vec<&VideoEntry>> = BTreeMap::new();
    for entry in snapshot {
        by_title.entry(entry.title.as_str()).or_default().push(entry);
    }

    let mut jobs = Vec::new();

    for (title, entries) in by_title {
        let Some(source) = entries
            .iter()
            .max_by(|a, b| {
                a.resolution
                    .cmp(&b.resolution)
                    // Equal resolutions: prefer the earlier container in the
                    // table, so make it compare as the larger element.
                    .then_with(|| b.container.cmp(&a.container))
            })
            .copied()
        else {
            continue;
        };

        let present: HashSet<(Resolution, Container)> = entries
            .iter()
            .map(|e| (e.resolution, e.container))
            .collect();

        for container in Container::ALL {
            for resolution in Resolution::up_to(source.resolution) {
                if present.contains(&(resolution, container)) {
                    continue;
                }
                let name = compose_filename(title, resolution, container);
                jobs.push(TranscodeJob {
                    id: JobId::new(),
                    title: title.to_string(),
                    resolution,
                    container,
                    source: source.path.clone(),
                    target: video_dir.join(name),
                });
            }
        }
    }

    jobs
}
