// src/watch/mod.rs

//! File watching and change coalescing.
//!
//! This module is responsible for:
//! - Wiring up a cross-platform filesystem watcher (`notify`) over the
//!   project root.
//! - Translating raw notify events into the pipeline's three event kinds
//!   (add, change, remove), filtered down to paths the pattern rules cover.
//! - Coalescing duplicate change notifications by modification timestamp.
//! - Managing per-file polling subscriptions in continuous mode.
//!
//! It does **not** know about versions or emission; it only turns
//! filesystem changes into registry-level events.

pub mod coordinator;
pub mod path_utils;
pub mod watcher;

pub use coordinator::{
    FileWatches, NullFileWatches, PollFileWatches, WatchCoordinator, POLL_INTERVAL_MS,
};
pub use watcher::{spawn_watcher, WatcherHandle};
