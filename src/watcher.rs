// Sounds directory watcher
//
// Files dropped into or removed from the sounds directory by something
// other than this module must still end up in (or out of) the sound cache.
// The watcher only signals that the directory changed; the consumer reruns
// the cache reconciliation pass.

use anyhow::{Context, Result};
use notify::{
    event::{EventKind, ModifyKind},
    Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher,
};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// The watched directory changed
#[derive(Debug, Clone)]
pub struct LibraryChangeEvent {
    /// Files involved in the change
    pub paths: Vec<PathBuf>,
    /// Timestamp when the event was generated
    pub timestamp: Instant,
}

/// Watches one library directory for added and removed files
pub struct LibraryWatcher {
    _watcher: RecommendedWatcher,
    receiver: mpsc::Receiver<LibraryChangeEvent>,
}

impl LibraryWatcher {
    /// Start watching `dir` (non-recursively)
    pub fn new(dir: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => match event.kind {
                    EventKind::Create(_)
                    | EventKind::Remove(_)
                    | EventKind::Modify(ModifyKind::Name(_))
                    | EventKind::Modify(ModifyKind::Data(_)) => {
                        tracing::debug!(kind = ?event.kind, paths = ?event.paths, "Library changed");
                        let change = LibraryChangeEvent {
                            paths: event.paths,
                            timestamp: Instant::now(),
                        };
                        if let Err(e) = tx.send(change) {
                            tracing::error!(error = %e, "Failed to send library change event");
                        }
                    }
                    _ => {
                        tracing::trace!(kind = ?event.kind, "Ignoring file event");
                    }
                },
                Err(e) => {
                    tracing::error!(error = %e, "File watcher error");
                }
            },
            NotifyConfig::default(),
        )
        .context("Failed to create file watcher")?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", dir.display()))?;

        tracing::info!(path = %dir.display(), "Library watcher initialized");

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// Try to receive a change event (non-blocking)
    pub fn try_recv(&self) -> Option<LibraryChangeEvent> {
        self.receiver.try_recv().ok()
    }

    /// Wait for the next change, then collect everything that follows
    /// within `settle`
    ///
    /// Returns `None` if the watcher is gone.
    pub fn next_batch(&self, settle: Duration) -> Option<Vec<LibraryChangeEvent>> {
        let first = self.receiver.recv().ok()?;
        let mut batch = vec![first];
        while let Ok(event) = self.receiver.recv_timeout(settle) {
            batch.push(event);
        }
        Some(batch)
    }
}
