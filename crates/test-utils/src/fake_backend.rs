use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use reemit::backend::{
    BackendDiagnostic, CompileBackend, EmitOutput, OutputArtifact, SourceHost,
};
use reemit::watch::FileWatches;

/// A fake incremental compiler that:
/// - records every `compile_and_emit` call with the version it saw
/// - returns one `<stem>.out` artifact per compiled file, embedding the
///   version and content snapshot so tests can assert byte-identical writes
/// - can be told to refuse emission for specific paths, producing one
///   canned diagnostic instead.
///
/// Clones share state, so tests can keep a handle after moving the backend
/// into a controller.
#[derive(Debug, Clone, Default)]
pub struct FakeCompileBackend {
    compiled: Arc<Mutex<Vec<(PathBuf, Option<String>)>>>,
    emitted: Arc<Mutex<Vec<(PathBuf, String)>>>,
    failing: Arc<Mutex<HashSet<PathBuf>>>,
}

impl FakeCompileBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `compile_and_emit` report `emit_skipped` for this path.
    pub fn fail_for(&self, path: impl Into<PathBuf>) {
        self.failing.lock().unwrap().insert(path.into());
    }

    /// Every `(path, version)` pair passed to `compile_and_emit`, in order.
    pub fn compiled(&self) -> Vec<(PathBuf, Option<String>)> {
        self.compiled.lock().unwrap().clone()
    }

    pub fn compile_count_for(&self, path: &Path) -> usize {
        self.compiled
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .count()
    }

    /// Every `(artifact name, text)` pair returned from a successful emit.
    pub fn emitted(&self) -> Vec<(PathBuf, String)> {
        self.emitted.lock().unwrap().clone()
    }
}

impl CompileBackend for FakeCompileBackend {
    fn compile_and_emit(
        &mut self,
        host: &dyn SourceHost,
        path: &Path,
    ) -> reemit::errors::Result<EmitOutput> {
        let version = host.version_of(path);
        self.compiled
            .lock()
            .unwrap()
            .push((path.to_path_buf(), version.clone()));

        if self.failing.lock().unwrap().contains(path) {
            return Ok(EmitOutput {
                emit_skipped: true,
                artifacts: Vec::new(),
            });
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let name = PathBuf::from(format!("{stem}.out"));
        let snapshot = host.snapshot_of(path).unwrap_or_default();
        let text = format!(
            "// {} v{}\n{}",
            path.display(),
            version.as_deref().unwrap_or("?"),
            snapshot
        );

        self.emitted.lock().unwrap().push((name.clone(), text.clone()));

        Ok(EmitOutput {
            emit_skipped: false,
            artifacts: vec![OutputArtifact { name, text }],
        })
    }

    fn diagnostics_for(
        &mut self,
        _host: &dyn SourceHost,
        path: &Path,
    ) -> Vec<BackendDiagnostic> {
        vec![BackendDiagnostic {
            file: Some(path.to_path_buf()),
            line: Some(1),
            column: Some(1),
            message: "fake compile error".to_string(),
        }]
    }
}

/// Per-file watch subscriptions that only record what was watched and
/// released, for asserting exactly-once release behaviour.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct RecordingFileWatches {
    watched: Arc<Mutex<Vec<PathBuf>>>,
    released: Arc<Mutex<Vec<PathBuf>>>,
}

impl RecordingFileWatches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watched(&self) -> Vec<PathBuf> {
        self.watched.lock().unwrap().clone()
    }

    pub fn released(&self) -> Vec<PathBuf> {
        self.released.lock().unwrap().clone()
    }
}

impl FileWatches for RecordingFileWatches {
    fn watch(&mut self, path: &Path) -> Result<()> {
        self.watched.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    fn unwatch(&mut self, path: &Path) -> Result<()> {
        self.released.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }
}
