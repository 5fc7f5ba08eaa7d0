// src/lib.rs

pub mod backend;
pub mod config;
pub mod emit;
pub mod errors;
pub mod fs;
pub mod lifecycle;
pub mod logging;
pub mod pattern;
pub mod registry;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::warn;

use crate::backend::CompileBackend;
use crate::config::loader::load_and_validate;
use crate::fs::{FileSystem, RealFileSystem};
use crate::lifecycle::{LifecycleController, PipelineEvent};
use crate::pattern::compile_rules;
use crate::watch::{NullFileWatches, PollFileWatches};

/// High-level entry point for embedding applications.
///
/// This wires together:
/// - config loading
/// - the tracked-file registry, coordinator and emit orchestrator
/// - the given compilation backend
/// - (continuous mode) the file watcher and Ctrl-C handling
///
/// In per-cycle mode this runs a single setup + cycle and returns, logging
/// accumulated diagnostics as warnings; hosts that drive multiple build
/// cycles call the [`LifecycleController`] hooks directly instead.
pub async fn run<B: CompileBackend + 'static>(
    config_path: impl AsRef<Path>,
    backend: B,
) -> Result<()> {
    let config_path = config_path.as_ref();
    let cfg = load_and_validate(config_path)?;
    let root = config_root_dir(config_path);

    let rules = compile_rules(
        &cfg.source().root,
        &cfg.source().folders,
        &cfg.source().extensions,
    )?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    if !cfg.options().mode.is_continuous() {
        let mut controller = LifecycleController::new(
            &cfg,
            rules,
            root,
            fs,
            Box::new(NullFileWatches),
            backend,
        );
        controller.setup()?;
        controller.run_cycle()?;

        let mut warnings = Vec::new();
        controller.post_cycle(&mut warnings);
        for warning in &warnings {
            warn!("{warning}");
        }
        return Ok(());
    }

    // Pipeline event channel.
    let (event_tx, event_rx) = mpsc::channel::<PipelineEvent>(64);

    // Per-file polling subscriptions feed the same channel as the
    // directory-level watcher.
    let watches = PollFileWatches::new(root.clone(), rules.clone(), event_tx.clone())?;

    let mut controller = LifecycleController::new(
        &cfg,
        rules.clone(),
        root.clone(),
        fs,
        Box::new(watches),
        backend,
    );
    controller.setup()?;

    let _watcher_handle = watch::spawn_watcher(root, rules, event_tx.clone())?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(PipelineEvent::ShutdownRequested).await;
        });
    }

    controller.run(event_rx).await?;
    Ok(())
}

/// Figure out a sensible project root for watching.
///
/// - If the config path has a non-empty parent (e.g. "configs/Reemit.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Reemit.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
