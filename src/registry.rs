// src/registry.rs

//! The versioned set of known source files.
//!
//! This is the single source of truth for "what exists and at what version".
//! All mutation flows through `&mut self` methods, so the owner serializes
//! mutations by construction; callers only ever see cloned snapshots, and
//! mutating a snapshot never affects the stored entry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::fs::FileSystem;

/// A source file known to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    /// Path relative to the project root, with forward slashes.
    pub source_path: PathBuf,
    /// Destination path relative to the project root, derived once at
    /// creation from the matching pattern rule; never recomputed.
    pub destination_path: PathBuf,
    /// Monotonic change counter; the compilation backend uses this as its
    /// cache key for the file.
    pub version: u64,
    /// Whether a per-file watch subscription is active for this entry.
    /// Must be released before the entry is removed.
    pub watched: bool,
}

#[derive(Debug, Default)]
pub struct TrackedFileRegistry {
    files: BTreeMap<PathBuf, TrackedFile>,
}

impl TrackedFileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new source file at version 0.
    ///
    /// Idempotent: a duplicate add never resets an existing entry's version
    /// or destination. Returns true if the entry was newly created.
    pub fn upsert(&mut self, path: impl Into<PathBuf>, destination: PathBuf) -> bool {
        let path = path.into();
        if self.files.contains_key(&path) {
            debug!(path = %path.display(), "duplicate add for tracked file; keeping existing entry");
            return false;
        }
        self.files.insert(
            path.clone(),
            TrackedFile {
                source_path: path,
                destination_path: destination,
                version: 0,
                watched: false,
            },
        );
        true
    }

    /// Increment a tracked file's version by 1, returning the new version.
    ///
    /// An untracked path is not an error: change events race with concurrent
    /// removals, so this is logged and ignored.
    pub fn bump_version(&mut self, path: &Path) -> Option<u64> {
        match self.files.get_mut(path) {
            Some(entry) => {
                entry.version += 1;
                debug!(path = %path.display(), version = entry.version, "bumped file version");
                Some(entry.version)
            }
            None => {
                warn!(path = %path.display(), "version bump for untracked file; ignoring");
                None
            }
        }
    }

    /// Increment every tracked file's version by 1.
    ///
    /// Used by per-cycle mode, where each host build cycle forces a full
    /// re-emission.
    pub fn bump_all(&mut self) {
        for entry in self.files.values_mut() {
            entry.version += 1;
        }
    }

    /// Stop tracking a file, returning the removed entry so the caller can
    /// release its watch subscription. Returns `None` if already removed.
    pub fn remove(&mut self, path: &Path) -> Option<TrackedFile> {
        self.files.remove(path)
    }

    /// Record whether a per-file watch subscription is active for `path`.
    pub fn mark_watched(&mut self, path: &Path, watched: bool) {
        if let Some(entry) = self.files.get_mut(path) {
            entry.watched = watched;
        }
    }

    pub fn get(&self, path: &Path) -> Option<&TrackedFile> {
        self.files.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    pub fn version_of(&self, path: &Path) -> Option<u64> {
        self.files.get(path).map(|f| f.version)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// All tracked source paths, in stable (sorted) order.
    pub fn source_paths(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }

    /// A read-only snapshot of the current entries, in stable order.
    pub fn snapshot(&self) -> Vec<TrackedFile> {
        self.files.values().cloned().collect()
    }

    /// Self-healing sweep: drop every entry whose underlying file no longer
    /// exists, returning the removed entries so the caller can release their
    /// watch subscriptions.
    ///
    /// Run immediately before emission to guard against watcher events lost
    /// to OS-level coalescing or startup races.
    pub fn reconcile_existence(&mut self, fs: &dyn FileSystem, root: &Path) -> Vec<TrackedFile> {
        let missing: Vec<PathBuf> = self
            .files
            .keys()
            .filter(|path| !fs.is_file(&root.join(path)))
            .cloned()
            .collect();

        let mut removed = Vec::with_capacity(missing.len());
        for path in missing {
            if let Some(entry) = self.files.remove(&path) {
                debug!(path = %path.display(), "tracked file vanished from disk; dropping entry");
                removed.push(entry);
            }
        }
        removed
    }
}
