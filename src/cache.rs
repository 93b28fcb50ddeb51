//! In-memory cache of decoded sounds
//!
//! Every file of the sounds directory is decoded once so it can be
//! triggered without disk or decoder latency. The cache is rebuilt from
//! disk by [`SoundCache::reconcile`]; each clip remembers the size and
//! modification time of the file it was decoded from so that replaced
//! files are decoded again.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tracing::{debug, info, warn};

use crate::audio::{AudioBackend, ClipBuffer};
use crate::error::Result;
use crate::library::{Library, LibraryKind};

/// Outcome of a reconciliation pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Sounds newly decoded into the cache
    pub loaded: Vec<String>,
    /// Cached sounds decoded again because their file changed
    pub reloaded: Vec<String>,
    /// Files deleted because they failed to decode
    pub removed: Vec<String>,
    /// Cache entries dropped because their file is gone
    pub evicted: Vec<String>,
}

impl ReconcileReport {
    /// Whether the pass changed anything
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
            && self.reloaded.is_empty()
            && self.removed.is_empty()
            && self.evicted.is_empty()
    }
}

/// Size and modification time of a sound file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    len: u64,
    modified: Option<SystemTime>,
}

impl FileStamp {
    fn of(path: &Path) -> Option<Self> {
        let metadata = fs::metadata(path).ok()?;
        Some(Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        })
    }
}

struct CachedSound {
    clip: Arc<ClipBuffer>,
    stamp: Option<FileStamp>,
}

type ClipMap = HashMap<String, CachedSound>;

/// Decoded sounds keyed by file name
pub struct SoundCache {
    backend: Arc<dyn AudioBackend>,
    clips: RwLock<ClipMap>,
}

impl SoundCache {
    /// Create an empty cache decoding through `backend`
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            backend,
            clips: RwLock::new(HashMap::new()),
        }
    }

    /// Decode a file and store it under its file name
    ///
    /// Returns false if the file can't be decoded; the caller decides what
    /// to do with it. A previously cached clip of the same name is dropped
    /// either way.
    pub fn bufferize(&self, path: &Path) -> bool {
        let Some(fullname) = path.file_name().and_then(|n| n.to_str()) else {
            warn!(path = %path.display(), "Unable to bufferize file with invalid name");
            return false;
        };

        let stamp = FileStamp::of(path);
        match self.backend.decode(path) {
            Ok(clip) => {
                debug!(sound = %fullname, "Sound bufferized");
                let cached = CachedSound {
                    clip: Arc::new(clip),
                    stamp,
                };
                self.write().insert(fullname.to_string(), cached);
                true
            }
            Err(e) => {
                warn!(sound = %fullname, error = %e, "Unable to bufferize file");
                self.evict(fullname);
                false
            }
        }
    }

    /// Decoded clip of a sound
    pub fn get(&self, fullname: &str) -> Option<Arc<ClipBuffer>> {
        self.read().get(fullname).map(|c| c.clip.clone())
    }

    /// Whether a sound is cached
    pub fn contains(&self, fullname: &str) -> bool {
        self.read().contains_key(fullname)
    }

    /// Drop a sound from the cache
    pub fn evict(&self, fullname: &str) -> bool {
        let removed = self.write().remove(fullname).is_some();
        if removed {
            debug!(sound = %fullname, "Sound evicted from cache");
        }
        removed
    }

    /// Number of cached sounds
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether nothing is cached
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Bring the cache in line with the sounds directory
    ///
    /// Decodes files not cached yet or changed since they were cached,
    /// deletes files that fail to decode and evicts entries whose file
    /// disappeared.
    pub fn reconcile(&self, library: &Library) -> Result<ReconcileReport> {
        let mut report = ReconcileReport::default();
        let entries = library.list(LibraryKind::Sound)?;

        for entry in &entries {
            let path = library.dir(LibraryKind::Sound).join(&entry.fullname);
            let cached = self.read().get(&entry.fullname).map(|c| c.stamp);
            let changed = match cached {
                None => false,
                Some(stamp) if stamp.is_some() && stamp == FileStamp::of(&path) => continue,
                Some(_) => true,
            };

            if self.bufferize(&path) {
                if changed {
                    debug!(sound = %entry.fullname, "Sound file changed, decoded again");
                    report.reloaded.push(entry.fullname.clone());
                } else {
                    report.loaded.push(entry.fullname.clone());
                }
            } else {
                warn!(sound = %entry.fullname, "Deleting invalid sound file");
                library.delete(LibraryKind::Sound, &entry.fullname)?;
                report.removed.push(entry.fullname.clone());
            }
        }

        let stale: Vec<String> = self
            .read()
            .keys()
            .filter(|name| !entries.iter().any(|e| &e.fullname == *name))
            .cloned()
            .collect();
        for name in stale {
            self.evict(&name);
            report.evicted.push(name);
        }

        if !report.is_empty() {
            info!(
                loaded = report.loaded.len(),
                reloaded = report.reloaded.len(),
                removed = report.removed.len(),
                evicted = report.evicted.len(),
                cached = self.len(),
                "Sound cache reconciled"
            );
        }

        Ok(report)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, ClipMap> {
        // a panic while holding the lock cannot leave the map half-updated
        self.clips.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, ClipMap> {
        self.clips.write().unwrap_or_else(|e| e.into_inner())
    }
}
