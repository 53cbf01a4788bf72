//! The media library: directory scanning and catalog ownership.
//!
//! Scans walk the video directory and parse every regular file against the
//! filename grammar. Malformed names and per-file I/O errors are logged and
//! skipped; only directory-level failures surface to the caller.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use vc_core::events::{EventBus, EventPayload};
use vc_core::filename;
use vc_core::{Container, Error, Resolution, Result, VideoEntry};

use crate::catalog::Catalog;

/// Outcome counters for one scan pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Regular files seen during the walk.
    pub files_seen: u64,
    /// New entries inserted into the catalog.
    pub added: u64,
    /// Files whose names did not match the grammar.
    pub skipped_malformed: u64,
    /// Files skipped because of I/O errors.
    pub errors: u64,
}

/// Owner of the in-memory catalog.
///
/// Writers (scan, the transcode executor via [`MediaLibrary::add`]) take an
/// exclusive lease; readers copy a snapshot out and never hold the lock
/// while filtering.
pub struct MediaLibrary {
    video_dir: PathBuf,
    catalog: RwLock<Catalog>,
    bus: Arc<EventBus>,
}

impl MediaLibrary {
    /// Create an empty library rooted at `video_dir`.
    pub fn new(video_dir: impl Into<PathBuf>, bus: Arc<EventBus>) -> Self {
        Self {
            video_dir: video_dir.into(),
            catalog: RwLock::new(Catalog::new()),
            bus,
        }
    }

    /// The directory this library scans and transcodes into.
    pub fn video_dir(&self) -> &Path {
        &self.video_dir
    }

    /// Walk the video directory once and register every parseable file.
    ///
    /// Emits a `CatalogChanged` event when the catalog gained entries.
    /// Directory-level errors (missing or unreadable root) are returned;
    /// everything per-file is logged and skipped.
    pub fn scan(&self) -> Result<ScanSummary> {
        let metadata = std::fs::metadata(&self.video_dir)?;
        if !metadata.is_dir() {
            return Err(Error::Config(format!(
                "video_dir is not a directory: {}",
                self.video_dir.display()
            )));
        }

        let mut summary = ScanSummary::default();
        let mut new_entries = Vec::new();

        for entry in walkdir::WalkDir::new(&self.video_dir)
            .follow_links(true)
            .into_iter()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!(error = %err, "Error walking video directory");
                    summary.errors += 1;
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }
            summary.files_seen += 1;

            let path = entry.path();
            match filename::parse_path(path) {
                Ok((title, resolution, container)) => {
                    new_entries.push(VideoEntry::new(title, resolution, container, path));
                }
                Err(_) => {
                    tracing::debug!(file = %path.display(), "Skipping file with unrecognized name");
                    summary.skipped_malformed += 1;
                }
            }
        }

        {
            let mut catalog = self.catalog.write();
            for entry in new_entries {
                if catalog.insert(entry) {
                    summary.added += 1;
                }
            }
        }

        if summary.added > 0 {
            self.bus.broadcast(EventPayload::CatalogChanged {
                added: summary.added as usize,
                removed: 0,
            });
        }

        tracing::info!(
            files_seen = summary.files_seen,
            added = summary.added,
            skipped = summary.skipped_malformed,
            errors = summary.errors,
            "Library scan complete"
        );

        Ok(summary)
    }

    /// Register a file produced outside a scan (the transcode executor).
    ///
    /// Verifies the path refers to a regular file before inserting. Returns
    /// `Ok(false)` for a duplicate key (the existing entry is untouched).
    pub fn add(&self, entry: VideoEntry) -> Result<bool> {
        let metadata = std::fs::metadata(&entry.path)?;
        if !metadata.is_file() {
            return Err(Error::not_found("regular file", entry.path.display()));
        }

        let inserted = self.catalog.write().insert(entry);
        if inserted {
            self.bus.broadcast(EventPayload::CatalogChanged {
                added: 1,
                removed: 0,
            });
        }
        Ok(inserted)
    }

    /// Copy the current entries out for lock-free filtering.
    pub fn snapshot(&self) -> Vec<VideoEntry> {
        self.catalog.read().snapshot()
    }

    /// Look up a single entry.
    pub fn find(
        &self,
        title: &str,
        resolution: Resolution,
        container: Container,
    ) -> Option<VideoEntry> {
        self.catalog.read().get(title, resolution, container).cloned()
    }

    /// Drop entries whose path no longer resolves to a regular file.
    ///
    /// Returns the number of entries removed.
    pub fn verify(&self) -> usize {
        let stale: Vec<_> = {
            let catalog = self.catalog.read();
            catalog
                .iter()
                .filter(|e| !e.path.is_file())
                .map(|e| (e.key(), e.path.clone()))
                .collect()
        };

        if stale.is_empty() {
            return 0;
        }

        let mut removed = 0;
        {
            let mut catalog = self.catalog.write();
            for (key, path) in &stale {
                // Re-check under the write lock; the file may have reappeared.
                if !path.is_file() && catalog.remove(key) {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            tracing::info!(removed, "Dropped stale catalog entries");
            self.bus.broadcast(EventPayload::CatalogChanged {
                added: 0,
                removed,
            });
        }
        removed
    }

    /// Number of catalog entries.
    pub fn len(&self) -> usize {
        self.catalog.read().len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.catalog.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_library(dir: &Path) -> MediaLibrary {
        MediaLibrary::new(dir, Arc::new(EventBus::default()))
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"fake video payload").unwrap();
        path
    }

    #[test]
    fn scan_registers_parseable_files() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "Forrest_Gump-720p.mkv");
        touch(tmp.path(), "Forrest_Gump-480p.mkv");
        touch(tmp.path(), "notes.txt");
        touch(tmp.path(), "Heat-4320p.mkv");

        let library = make_library(tmp.path());
        let summary = library.scan().unwrap();

        assert_eq!(summary.files_seen, 4);
        assert_eq!(summary.added, 2);
        assert_eq!(summary.skipped_malformed, 2);
        assert_eq!(library.len(), 2);
        assert!(library
            .find("Forrest_Gump", Resolution::P720, Container::Mkv)
            .is_some());
    }

    #[test]
    fn rescan_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "Alien-480p.mp4");

        let library = make_library(tmp.path());
        assert_eq!(library.scan().unwrap().added, 1);
        let second = library.scan().unwrap();
        assert_eq!(second.added, 0);
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn scan_missing_directory_errors() {
        let library = make_library(Path::new("/nonexistent/videos"));
        assert!(library.scan().is_err());
    }

    #[test]
    fn scan_emits_catalog_changed() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "Alien-480p.mp4");

        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let library = MediaLibrary::new(tmp.path(), bus);
        library.scan().unwrap();

        let event = rx.try_recv().unwrap();
        assert!(matches!(
            event.payload,
            EventPayload::CatalogChanged { added: 1, removed: 0 }
        ));
    }

    #[test]
    fn add_requires_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let library = make_library(tmp.path());

        let missing = VideoEntry::new(
            "Heat",
            Resolution::P480,
            Container::Mp4,
            tmp.path().join("Heat-480p.mp4"),
        );
        assert!(library.add(missing.clone()).is_err());

        touch(tmp.path(), "Heat-480p.mp4");
        assert!(library.add(missing).unwrap());
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn add_duplicate_returns_false() {
        let tmp = tempfile::tempdir().unwrap();
        let path = touch(tmp.path(), "Heat-480p.mp4");
        let library = make_library(tmp.path());

        let entry = VideoEntry::new("Heat", Resolution::P480, Container::Mp4, path);
        assert!(library.add(entry.clone()).unwrap());
        assert!(!library.add(entry).unwrap());
    }

    #[test]
    fn verify_drops_deleted_files() {
        let tmp = tempfile::tempdir().unwrap();
        let keep = touch(tmp.path(), "Alien-480p.mp4");
        let gone = touch(tmp.path(), "Heat-480p.mp4");

        let library = make_library(tmp.path());
        library.scan().unwrap();
        assert_eq!(library.len(), 2);

        std::fs::remove_file(&gone).unwrap();
        assert_eq!(library.verify(), 1);
        assert_eq!(library.len(), 1);
        assert!(keep.is_file());
        assert!(library.find("Alien", Resolution::P480, Container::Mp4).is_some());
        assert!(library.find("Heat", Resolution::P480, Container::Mp4).is_none());
    }

    #[test]
    fn snapshot_does_not_hold_the_lock() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "Alien-480p.mp4");
        let library = make_library(tmp.path());
        library.scan().unwrap();

        let snapshot = library.snapshot();
        assert_eq!(snapshot.len(), 1);
        // A writer can proceed while we hold the snapshot.
        touch(tmp.path(), "Heat-240p.avi");
        library.scan().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(library.len(), 2);
    }
}
