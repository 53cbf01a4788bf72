//! Transcode job model.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use vc_core::{Container, JobId, Resolution, VideoEntry};

/// Lifecycle state of a transcode job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed,
    Cancelled,
}

/// One planned transcode: produce `target` from `source`.
///
/// The planner only emits jobs whose source resolution is at least the
/// target resolution, so a job never upscales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeJob {
    pub id: JobId,
    pub title: String,
    pub resolution: Resolution,
    pub container: Container,
    pub source: PathBuf,
    pub target: PathBuf,
}

impl TranscodeJob {
    /// The catalog entry this job materializes on success.
    pub fn target_entry(&self) -> VideoEntry {
        VideoEntry::new(
            self.title.clone(),
            self.resolution,
            self.container,
            self.target.clone(),
        )
    }
}
