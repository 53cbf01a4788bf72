//! The catalog query service.
//!
//! Pure functions over a catalog snapshot. The ordering contract for client
//! listings is container ascending, then title ascending, then resolution
//! descending, so a client sees each title's variants from best to worst.

use std::cmp::Reverse;

use vc_core::policy;
use vc_core::{Container, VideoEntry};

/// Entries in `container` whose height fits under the bandwidth ceiling.
pub fn list_videos(snapshot: &[VideoEntry], container: Container, bandwidth_mbps: f64) -> Vec<VideoEntry> {
    let ceiling = policy::ceiling_for_bandwidth(bandwidth_mbps);

    let mut videos: Vec<VideoEntry> = snapshot
        .iter()
        .filter(|e| e.container == container && e.resolution <= ceiling)
        .cloned()
        .collect();

    videos.sort_by(|a, b| {
        (a.container, &a.title, Reverse(a.resolution))
            .cmp(&(b.container, &b.title, Reverse(b.resolution)))
    });
    videos
}

/// Distinct containers present in the snapshot, in table order.
///
/// An empty catalog yields the full supported set so a client can still
/// pick a preference before any media exists.
pub fn list_containers(snapshot: &[VideoEntry]) -> Vec<Container> {
    if snapshot.is_empty() {
        return Container::ALL.to_vec();
    }

    Container::ALL
        .into_iter()
        .filter(|c| snapshot.iter().any(|e| e.container == *c))
        .collect()
}
