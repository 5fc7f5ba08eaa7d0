// src/emit.rs

//! Emission orchestration.
//!
//! Given tracked files, asks the compilation backend for output, writes the
//! returned artifacts to their mapped destinations, and accumulates
//! diagnostics for the host pipeline to drain after the cycle.
//!
//! Every emission is preceded by the registry's existence sweep, so a file
//! that vanished between watch notification and emission is silently dropped
//! instead of handed to the backend.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::{BackendDiagnostic, CompileBackend, OutputArtifact, RegistryHost};
use crate::errors::{ReemitError, Result};
use crate::fs::FileSystem;
use crate::registry::{TrackedFile, TrackedFileRegistry};
use crate::watch::WatchCoordinator;

/// A diagnostic attributed to a source file, accumulated per emission cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub source_path: PathBuf,
    /// 1-based line, when the backend reported a position.
    pub line: Option<u32>,
    /// 1-based column, when the backend reported a position.
    pub column: Option<u32>,
    pub message: String,
}

impl DiagnosticRecord {
    /// Attribute a backend diagnostic to `emitted_path` when the backend did
    /// not name a file itself (global diagnostics).
    fn from_backend(emitted_path: &Path, diag: BackendDiagnostic) -> Self {
        Self {
            source_path: diag.file.unwrap_or_else(|| emitted_path.to_path_buf()),
            line: diag.line,
            column: diag.column,
            message: diag.message,
        }
    }
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(
                f,
                "{} ({},{}): {}",
                self.source_path.display(),
                line,
                column,
                self.message
            ),
            _ => write!(f, "{}: {}", self.source_path.display(), self.message),
        }
    }
}

/// Outcome of a single file's emission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitStatus {
    /// Artifacts were written; carries how many.
    Emitted(usize),
    /// The backend refused to emit; diagnostics were collected instead.
    SkippedWithErrors,
    /// The file was removed by the existence sweep (or was never tracked);
    /// nothing to do.
    SourceGone,
}

/// Drives the compile-and-write sequence for tracked files.
pub struct EmitOrchestrator {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    diagnostics: Vec<DiagnosticRecord>,
}

impl fmt::Debug for EmitOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmitOrchestrator")
            .field("root", &self.root)
            .field("diagnostics", &self.diagnostics.len())
            .finish_non_exhaustive()
    }
}

impl EmitOrchestrator {
    pub fn new(fs: Arc<dyn FileSystem>, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
            diagnostics: Vec::new(),
        }
    }

    /// Emit a single tracked file.
    ///
    /// Runs the existence sweep first; if `path` itself was swept away (or is
    /// not tracked), returns [`EmitStatus::SourceGone`] without touching the
    /// backend. Diagnostics from a refused emit are accumulated, not
    /// returned as errors; filesystem write failures are fatal for this
    /// file's emission and propagate.
    pub fn emit_one(
        &mut self,
        registry: &mut TrackedFileRegistry,
        coordinator: &mut WatchCoordinator,
        backend: &mut dyn CompileBackend,
        path: &Path,
    ) -> Result<EmitStatus> {
        self.sweep(registry, coordinator)?;

        let Some(tracked) = registry.get(path).cloned() else {
            debug!(path = %path.display(), "skipping emission for vanished file");
            return Ok(EmitStatus::SourceGone);
        };

        let host = RegistryHost::new(registry, self.fs.as_ref(), &self.root);
        let output = backend.compile_and_emit(&host, path)?;

        if output.emit_skipped {
            info!("Emitting {} failed", path.display());
            for diag in backend.diagnostics_for(&host, path) {
                self.diagnostics.push(DiagnosticRecord::from_backend(path, diag));
            }
            return Ok(EmitStatus::SkippedWithErrors);
        }

        info!("Emitting {}", path.display());
        let written = self.write_artifacts(&tracked, &output.artifacts)?;
        Ok(EmitStatus::Emitted(written))
    }

    /// Emit a batch of tracked files in order.
    ///
    /// Compilation failures for one file never abort the rest (they surface
    /// as accumulated diagnostics); write failures do.
    pub fn emit_many(
        &mut self,
        registry: &mut TrackedFileRegistry,
        coordinator: &mut WatchCoordinator,
        backend: &mut dyn CompileBackend,
        paths: &[PathBuf],
    ) -> Result<Vec<EmitStatus>> {
        let mut statuses = Vec::with_capacity(paths.len());
        for path in paths {
            statuses.push(self.emit_one(registry, coordinator, backend, path)?);
        }
        Ok(statuses)
    }

    /// Diagnostics accumulated since the last drain.
    pub fn diagnostics(&self) -> &[DiagnosticRecord] {
        &self.diagnostics
    }

    /// Drain accumulated diagnostics, clearing them for the next cycle.
    pub fn take_diagnostics(&mut self) -> Vec<DiagnosticRecord> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Run the existence sweep, releasing watch subscriptions for every
    /// entry it removed.
    fn sweep(
        &mut self,
        registry: &mut TrackedFileRegistry,
        coordinator: &mut WatchCoordinator,
    ) -> Result<Vec<TrackedFile>> {
        let removed = registry.reconcile_existence(self.fs.as_ref(), &self.root);
        for entry in &removed {
            if entry.watched {
                coordinator.release(&entry.source_path)?;
            }
        }
        Ok(removed)
    }

    fn write_artifacts(
        &self,
        tracked: &TrackedFile,
        artifacts: &[OutputArtifact],
    ) -> Result<usize> {
        let dest_dir = tracked
            .destination_path
            .parent()
            .unwrap_or_else(|| Path::new(""));
        let dest_dir = self.root.join(dest_dir);
        self.fs.create_dir_all(&dest_dir)?;

        for artifact in artifacts {
            let name = artifact.name.file_name().ok_or_else(|| {
                ReemitError::EmitError(format!(
                    "backend artifact {:?} has no base name",
                    artifact.name
                ))
            })?;
            let target = dest_dir.join(name);
            self.fs.write(&target, artifact.text.as_bytes())?;
            debug!(target = %target.display(), "wrote artifact");
        }

        Ok(artifacts.len())
    }
}
