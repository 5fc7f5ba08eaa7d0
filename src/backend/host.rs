// src/backend/host.rs

use std::path::{Path, PathBuf};

use crate::backend::SourceHost;
use crate::fs::FileSystem;
use crate::registry::TrackedFileRegistry;

/// [`SourceHost`] implementation backed by the tracked-file registry.
///
/// Borrows the registry read-only for the duration of one backend call, so
/// the backend always sees the same file set and versions the engine does.
pub struct RegistryHost<'a> {
    registry: &'a TrackedFileRegistry,
    fs: &'a dyn FileSystem,
    root: &'a Path,
}

impl<'a> RegistryHost<'a> {
    pub fn new(registry: &'a TrackedFileRegistry, fs: &'a dyn FileSystem, root: &'a Path) -> Self {
        Self { registry, fs, root }
    }
}

impl SourceHost for RegistryHost<'_> {
    fn source_paths(&self) -> Vec<PathBuf> {
        self.registry.source_paths()
    }

    fn version_of(&self, path: &Path) -> Option<String> {
        self.registry.version_of(path).map(|v| v.to_string())
    }

    fn snapshot_of(&self, path: &Path) -> Option<String> {
        let abs = self.root.join(path);
        if !self.fs.is_file(&abs) {
            return None;
        }
        self.fs.read_to_string(&abs).ok()
    }
}
