//! vc-library: the in-memory video catalog.
//!
//! [`MediaLibrary`] owns the catalog of materialized video files under a
//! single-writer lock, populates it by scanning the video directory, and
//! exposes cheap snapshots for the query service. The transcode executor
//! feeds completed outputs back in through [`MediaLibrary::add`]; it never
//! writes into the catalog directly.

pub mod catalog;
pub mod library;
pub mod query;

pub use catalog::Catalog;
pub use library::{MediaLibrary, ScanSummary};
pub use query::{list_containers, list_videos};
