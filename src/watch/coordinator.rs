// src/watch/coordinator.rs

//! Change coalescing and per-file watch subscriptions.
//!
//! The coordinator owns two things:
//!
//! - the per-path "last seen" modification timestamps used to reject
//!   spurious or out-of-order change notifications (a change is applied only
//!   when its timestamp is strictly newer than the recorded one; add and
//!   remove events are never timestamp-filtered);
//! - the per-file polling subscriptions taken in continuous mode to catch
//!   edits the directory-level watcher misses. These live behind the
//!   [`FileWatches`] trait so tests never touch a real watcher, and each
//!   subscription is released exactly once, on removal.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::Result;
use notify::{Config, PollWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::debug;

use crate::lifecycle::PipelineEvent;
use crate::pattern::PatternRule;
use crate::watch::watcher::forward_event;

/// Polling interval for per-file subscriptions.
pub const POLL_INTERVAL_MS: u64 = 250;

/// Trait abstracting per-file watch subscriptions.
///
/// Production code uses [`PollFileWatches`]; tests can provide an
/// implementation that records which paths were watched and released.
pub trait FileWatches: Send {
    fn watch(&mut self, path: &Path) -> Result<()>;
    fn unwatch(&mut self, path: &Path) -> Result<()>;
}

/// No-op subscriptions, for per-cycle mode where no per-file watches are
/// ever taken.
#[derive(Debug, Default)]
pub struct NullFileWatches;

impl FileWatches for NullFileWatches {
    fn watch(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn unwatch(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }
}

/// Per-file subscriptions backed by a `notify::PollWatcher`.
///
/// Events are forwarded from the blocking notify callback over an unbounded
/// channel into an async translation task, which sends [`PipelineEvent`]s
/// into the pipeline channel, same as the directory-level watcher.
pub struct PollFileWatches {
    inner: PollWatcher,
}

impl PollFileWatches {
    pub fn new(
        root: PathBuf,
        rules: Vec<PatternRule>,
        pipeline_tx: mpsc::Sender<PipelineEvent>,
    ) -> Result<Self> {
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<notify::Event>();

        let inner = PollWatcher::new(
            move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    if let Err(err) = raw_tx.send(event) {
                        eprintln!("reemit: failed to forward poll event: {err}");
                    }
                }
                Err(err) => {
                    eprintln!("reemit: file poll error: {err}");
                }
            },
            Config::default().with_poll_interval(Duration::from_millis(POLL_INTERVAL_MS)),
        )?;

        tokio::spawn(async move {
            while let Some(event) = raw_rx.recv().await {
                if !forward_event(&root, &rules, event, &pipeline_tx).await {
                    break;
                }
            }
            debug!("poll watch event loop finished");
        });

        Ok(Self { inner })
    }
}

impl FileWatches for PollFileWatches {
    fn watch(&mut self, path: &Path) -> Result<()> {
        self.inner.watch(path, RecursiveMode::NonRecursive)?;
        Ok(())
    }

    fn unwatch(&mut self, path: &Path) -> Result<()> {
        self.inner.unwatch(path)?;
        Ok(())
    }
}

/// Translates watcher notifications into decisions the registry can act on.
pub struct WatchCoordinator {
    root: PathBuf,
    watches: Box<dyn FileWatches>,
    last_seen: HashMap<PathBuf, SystemTime>,
}

impl fmt::Debug for WatchCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchCoordinator")
            .field("root", &self.root)
            .field("last_seen", &self.last_seen.len())
            .finish_non_exhaustive()
    }
}

impl WatchCoordinator {
    pub fn new(root: impl Into<PathBuf>, watches: Box<dyn FileWatches>) -> Self {
        Self {
            root: root.into(),
            watches,
            last_seen: HashMap::new(),
        }
    }

    /// Decide whether a reported modification should be applied.
    ///
    /// Valid only if `mtime` is strictly newer than the previously recorded
    /// timestamp for `path`; the accepted timestamp becomes the new marker.
    /// A notification without a timestamp cannot be coalesced and is always
    /// accepted.
    pub fn accept_change(&mut self, path: &Path, mtime: Option<SystemTime>) -> bool {
        let Some(mtime) = mtime else {
            return true;
        };
        match self.last_seen.get(path) {
            Some(prev) if mtime <= *prev => {
                debug!(path = %path.display(), "stale change notification; ignoring");
                false
            }
            _ => {
                self.last_seen.insert(path.to_path_buf(), mtime);
                true
            }
        }
    }

    /// Take a per-file subscription for a tracked source (continuous mode).
    pub fn subscribe(&mut self, rel_path: &Path) -> Result<()> {
        self.watches.watch(&self.root.join(rel_path))
    }

    /// Release a per-file subscription and drop the path's timestamp marker.
    ///
    /// Callers guard this with the tracked entry's `watched` flag so a
    /// subscription is released exactly once.
    pub fn release(&mut self, rel_path: &Path) -> Result<()> {
        self.last_seen.remove(rel_path);
        self.watches.unwatch(&self.root.join(rel_path))
    }
}
