//! vc-transcode: variant planning and transcoder execution.
//!
//! The planner computes, per title, the missing `(container, resolution)`
//! tuples below the title's best source. The executor runs the resulting
//! jobs through ffmpeg under a bounded worker pool and registers every
//! completed output back with the media library.

pub mod executor;
pub mod job;
pub mod planner;

pub use executor::Executor;
pub use job::{JobState, TranscodeJob};
pub use planner::plan;
