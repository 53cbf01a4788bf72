//! The catalog data structure.
//!
//! A set of [`VideoEntry`] keyed by `(title, resolution, container)` with a
//! by-title index so the transcode planner can enumerate a title's variants
//! without walking the whole set.

use std::collections::{BTreeSet, HashMap};

use vc_core::{Container, Resolution, VideoEntry};

/// Identity key of a catalog entry.
pub type EntryKey = (String, Resolution, Container);

/// In-memory set of video entries with fast lookup by key and by title.
#[derive(Debug, Default)]
pub struct Catalog {
    entries: HashMap<EntryKey, VideoEntry>,
    by_title: HashMap<String, BTreeSet<(Resolution, Container)>>,
}

impl Catalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry. Returns `false` if an entry with the same key was
    /// already present (the existing entry wins).
    pub fn insert(&mut self, entry: VideoEntry) -> bool {
        let key = entry.key();
        if self.entries.contains_key(&key) {
            return false;
        }
        self.by_title
            .entry(entry.title.clone())
            .or_default()
            .insert((entry.resolution, entry.container));
        self.entries.insert(key, entry);
        true
    }

    /// Remove an entry by key. Returns `true` if it was present.
    pub fn remove(&mut self, key: &EntryKey) -> bool {
        if self.entries.remove(key).is_none() {
            return false;
        }
        if let Some(variants) = self.by_title.get_mut(&key.0) {
            variants.remove(&(key.1, key.2));
            if variants.is_empty() {
                self.by_title.remove(&key.0);
            }
        }
        true
    }

    /// Look up an entry by its components.
    pub fn get(&self, title: &str, resolution: Resolution, container: Container) -> Option<&VideoEntry> {
        self.entries
            .get(&(title.to_string(), resolution, container))
    }

    /// Whether a `(title, resolution, container)` tuple is present.
    pub fn contains(&self, title: &str, resolution: Resolution, container: Container) -> bool {
        self.get(title, resolution, container).is_some()
    }

    /// All distinct titles.
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.by_title.keys().map(String::as_str)
    }

    /// The `(resolution, container)` variants present for a title.
    pub fn variants(&self, title: &str) -> impl Iterator<Item = (Resolution, Container)> + '_ {
        self.by_title
            .get(title)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Copy all entries out, sorted by key for deterministic iteration.
    pub fn snapshot(&self) -> Vec<VideoEntry> {
        let mut entries: Vec<VideoEntry> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| {
            (&a.title, a.container, a.resolution).cmp(&(&b.title, b.container, b.resolution))
        });
        entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over all entries (arbitrary order).
    pub fn iter(&self) -> impl Iterator<Item = &VideoEntry> {
        self.entries.values()
    }
}
