// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::lifecycle::PipelineEvent;
use crate::pattern::{first_match, PatternRule};
use crate::watch::path_utils::relative_str;

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive
/// for as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Spawn a filesystem watcher that observes the given `root` directory
/// recursively and sends a [`PipelineEvent`] for every path covered by one
/// of the compiled pattern rules.
///
/// - `root` is the project root against which all glob patterns are
///   evaluated.
/// - `rules` is the compiled pattern-rule set; paths matching no rule are
///   dropped here and never reach the pipeline.
/// - `pipeline_tx` is the channel into the lifecycle controller.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    rules: Vec<PatternRule>,
    pipeline_tx: mpsc::Sender<PipelineEvent>,
) -> Result<WatcherHandle> {
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    // Channel from the blocking notify callback into the async world.
    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<Event>();

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        {
            let raw_tx = raw_tx.clone();
            move |res: notify::Result<Event>| {
                match res {
                    Ok(event) => {
                        if let Err(err) = raw_tx.send(event) {
                            // We can't log via tracing here easily, so fallback to stderr.
                            eprintln!("reemit: failed to forward notify event: {err}");
                        }
                    }
                    Err(err) => {
                        eprintln!("reemit: file watch error: {err}");
                    }
                }
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::Recursive)?;

    info!("file watcher started on {:?}", root);

    // Async task that consumes notify events and forwards pipeline events to
    // the controller.
    tokio::spawn(async move {
        while let Some(event) = raw_rx.recv().await {
            debug!(?event, "received notify event");
            if !forward_event(&root, &rules, event, &pipeline_tx).await {
                break;
            }
        }
        debug!("watcher event loop finished");
    });

    Ok(WatcherHandle { _inner: watcher })
}

/// Translate one notify event into pipeline events and send them.
///
/// Paths that cannot be relativized against `root` or that match no rule
/// are dropped. Returns false once the pipeline channel is closed, so
/// callers can stop their loop.
pub(crate) async fn forward_event(
    root: &Path,
    rules: &[PatternRule],
    event: Event,
    pipeline_tx: &mpsc::Sender<PipelineEvent>,
) -> bool {
    for path in &event.paths {
        let Some(rel) = relative_str(root, path) else {
            debug!(?path, ?root, "could not relativize event path; ignoring");
            continue;
        };

        if first_match(rules, &rel).is_none() {
            debug!(rel = %rel, "event path matches no pattern rule; ignoring");
            continue;
        }

        let Some(pipeline_event) = classify(&event.kind, path, PathBuf::from(&rel)) else {
            continue;
        };

        if pipeline_tx.send(pipeline_event).await.is_err() {
            // If the controller channel is closed, there's no point keeping
            // the watcher loop alive.
            return false;
        }
    }
    true
}

/// Map a notify event kind for one path onto the pipeline's three event
/// kinds.
///
/// A modification of a path that no longer exists (typically a
/// rename-away) is reported as a removal; the existence sweep would catch
/// it anyway, this just gets there sooner.
fn classify(kind: &EventKind, abs_path: &Path, rel_path: PathBuf) -> Option<PipelineEvent> {
    match kind {
        EventKind::Create(_) => Some(PipelineEvent::SourceAdded { path: rel_path }),
        EventKind::Remove(_) => Some(PipelineEvent::SourceRemoved { path: rel_path }),
        EventKind::Modify(_) => {
            if !abs_path.exists() {
                return Some(PipelineEvent::SourceRemoved { path: rel_path });
            }
            let mtime = std::fs::metadata(abs_path)
                .and_then(|m| m.modified())
                .ok();
            Some(PipelineEvent::SourceChanged {
                path: rel_path,
                mtime,
            })
        }
        _ => None,
    }
}
