// src/lifecycle.rs

//! Lifecycle control: host pipeline hooks and the continuous event loop.
//!
//! The controller owns the registry, the coordinator, the orchestrator and
//! the backend, and drives them from three host hook points:
//!
//! - [`LifecycleController::setup`] on pipeline initialization,
//! - [`LifecycleController::run_cycle`] once per host build cycle
//!   (per-cycle mode only),
//! - [`LifecycleController::post_cycle`] after each cycle, draining
//!   diagnostics into the host's warning channel.
//!
//! In continuous mode there is no batch phase: emission happens one file at
//! a time from [`LifecycleController::handle_event`], fed by the watcher
//! through [`LifecycleController::run`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backend::CompileBackend;
use crate::config::ConfigFile;
use crate::emit::EmitOrchestrator;
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::pattern::{first_match, PatternRule};
use crate::registry::TrackedFileRegistry;
use crate::types::EmitMode;
use crate::watch::{FileWatches, WatchCoordinator};

/// Events flowing into the controller from the watchers.
///
/// Paths are relative to the project root, with forward slashes.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// A path matching a pattern rule appeared on disk.
    SourceAdded { path: PathBuf },
    /// A tracked path's content was reported modified. `mtime` is the
    /// reported modification timestamp, when the watcher could stat it.
    SourceChanged {
        path: PathBuf,
        mtime: Option<SystemTime>,
    },
    /// A path disappeared from disk.
    SourceRemoved { path: PathBuf },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Wires the registry, coordinator, orchestrator and backend to the host
/// pipeline's hook points.
pub struct LifecycleController<B: CompileBackend> {
    rules: Vec<PatternRule>,
    registry: TrackedFileRegistry,
    coordinator: WatchCoordinator,
    orchestrator: EmitOrchestrator,
    backend: B,
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    source_root: String,
    output_root: PathBuf,
    mode: EmitMode,
}

impl<B: CompileBackend> fmt::Debug for LifecycleController<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleController")
            .field("root", &self.root)
            .field("mode", &self.mode)
            .field("tracked", &self.registry.len())
            .finish_non_exhaustive()
    }
}

impl<B: CompileBackend> LifecycleController<B> {
    pub fn new(
        cfg: &ConfigFile,
        rules: Vec<PatternRule>,
        root: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        watches: Box<dyn FileWatches>,
        backend: B,
    ) -> Self {
        let root = root.into();
        Self {
            rules,
            registry: TrackedFileRegistry::new(),
            coordinator: WatchCoordinator::new(root.clone(), watches),
            orchestrator: EmitOrchestrator::new(fs.clone(), root.clone()),
            backend,
            fs,
            root,
            source_root: cfg.source().root.clone(),
            output_root: PathBuf::from(&cfg.output().root),
            mode: cfg.options().mode,
        }
    }

    /// Setup hook: seed the registry from a synchronous directory scan.
    ///
    /// In continuous mode every discovered file also gets a per-file watch
    /// subscription, and all tracked files are emitted once.
    pub fn setup(&mut self) -> Result<()> {
        for (path, destination) in self.scan_sources()? {
            self.registry.upsert(path, destination);
        }
        info!(tracked = self.registry.len(), "initial source scan complete");

        if self.mode.is_continuous() {
            let paths = self.registry.source_paths();
            for path in &paths {
                self.coordinator.subscribe(path)?;
                self.registry.mark_watched(path, true);
            }
            self.emit_batch(&paths)?;
        }

        Ok(())
    }

    /// Per-cycle hook: force a full re-emission of every tracked file.
    ///
    /// Only meaningful when continuous mode is disabled; there is no
    /// external change detection in per-cycle mode, so every cycle bumps
    /// every version and re-emits everything.
    pub fn run_cycle(&mut self) -> Result<()> {
        if self.mode.is_continuous() {
            debug!("run_cycle is a no-op in continuous mode");
            return Ok(());
        }

        self.registry.bump_all();
        let paths = self.registry.source_paths();
        self.emit_batch(&paths)?;
        Ok(())
    }

    /// Post-cycle hook: drain accumulated diagnostics into the host's
    /// warning channel, clearing them for the next cycle.
    pub fn post_cycle(&mut self, warnings: &mut Vec<String>) {
        for diag in self.orchestrator.take_diagnostics() {
            warnings.push(diag.to_string());
        }
    }

    /// Apply one watcher event to the registry (and, in continuous mode,
    /// emit the affected file).
    ///
    /// Returns false when the controller should stop its event loop.
    pub fn handle_event(&mut self, event: PipelineEvent) -> Result<bool> {
        match event {
            PipelineEvent::SourceAdded { path } => {
                let rel = path_str(&path);
                let destination = match first_match(&self.rules, &rel) {
                    Some(rule) => self.output_root.join(rule.destination_for(&rel)),
                    None => {
                        debug!(path = %rel, "added path matches no pattern rule; ignoring");
                        return Ok(true);
                    }
                };

                if self.registry.upsert(path.clone(), destination) && self.mode.is_continuous() {
                    self.coordinator.subscribe(&path)?;
                    self.registry.mark_watched(&path, true);
                    self.emit_single(&path)?;
                }
            }
            PipelineEvent::SourceChanged { path, mtime } => {
                if !self.coordinator.accept_change(&path, mtime) {
                    return Ok(true);
                }
                if self.registry.bump_version(&path).is_some() && self.mode.is_continuous() {
                    self.emit_single(&path)?;
                }
            }
            PipelineEvent::SourceRemoved { path } => {
                if let Some(entry) = self.registry.remove(&path) {
                    if entry.watched {
                        self.coordinator.release(&path)?;
                    }
                    info!(path = %path.display(), "stopped tracking removed source");
                }
            }
            PipelineEvent::ShutdownRequested => return Ok(false),
        }

        Ok(true)
    }

    /// Continuous-mode event loop.
    ///
    /// Consumes pipeline events until the channel closes or a shutdown is
    /// requested, then releases every live subscription.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<PipelineEvent>) -> Result<()> {
        info!("reemit pipeline started");

        loop {
            let event = match event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("pipeline event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "pipeline received event");

            if !self.handle_event(event)? {
                info!("shutdown requested; stopping pipeline");
                break;
            }
        }

        self.stop()?;
        info!("pipeline exiting");
        Ok(())
    }

    /// Release every live per-file subscription, exactly once each.
    pub fn stop(&mut self) -> Result<()> {
        for entry in self.registry.snapshot() {
            if entry.watched {
                self.coordinator.release(&entry.source_path)?;
                self.registry.mark_watched(&entry.source_path, false);
            }
        }
        Ok(())
    }

    /// Compiled pattern rules, for wiring up the watcher.
    pub fn rules(&self) -> &[PatternRule] {
        &self.rules
    }

    /// Read-only view of the tracked-file registry, for inspection.
    pub fn registry(&self) -> &TrackedFileRegistry {
        &self.registry
    }

    fn emit_single(&mut self, path: &Path) -> Result<()> {
        self.orchestrator.emit_one(
            &mut self.registry,
            &mut self.coordinator,
            &mut self.backend,
            path,
        )?;
        Ok(())
    }

    fn emit_batch(&mut self, paths: &[PathBuf]) -> Result<()> {
        self.orchestrator.emit_many(
            &mut self.registry,
            &mut self.coordinator,
            &mut self.backend,
            paths,
        )?;
        Ok(())
    }

    /// Walk the source root and pair every file covered by a pattern rule
    /// with its computed destination.
    fn scan_sources(&self) -> Result<Vec<(PathBuf, PathBuf)>> {
        let scan_root = if self.source_root.is_empty() {
            self.root.clone()
        } else {
            self.root.join(&self.source_root)
        };

        if !self.fs.is_dir(&scan_root) {
            warn!(dir = %scan_root.display(), "source root does not exist; nothing to track");
            return Ok(Vec::new());
        }

        let mut found = Vec::new();
        let mut stack = vec![scan_root];

        while let Some(dir) = stack.pop() {
            for path in self.fs.read_dir(&dir)? {
                if self.fs.is_dir(&path) {
                    stack.push(path);
                } else if self.fs.is_file(&path) {
                    if let Ok(rel) = path.strip_prefix(&self.root) {
                        let rel_str = rel.to_string_lossy().replace('\\', "/");
                        if let Some(rule) = first_match(&self.rules, &rel_str) {
                            let destination = self.output_root.join(rule.destination_for(&rel_str));
                            found.push((PathBuf::from(rel_str), destination));
                        }
                    }
                }
            }
        }

        Ok(found)
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
