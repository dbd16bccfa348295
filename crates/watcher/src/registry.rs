//! Watch id <-> path bookkeeping
//!
//! Holds no kernel resource. The channel issues the syscalls and mirrors
//! their outcome here.

use crate::event::WatchId;
use ahash::AHashMap;
use std::path::{Path, PathBuf};

/// Two-way mapping between live watch ids and the paths they were added for
///
/// At most one entry per path and one per id; the two maps are always
/// inverses of each other.
#[derive(Debug, Default, Clone)]
pub struct WatchRegistry {
    path_to_id: AHashMap<PathBuf, WatchId>,
    id_to_path: AHashMap<WatchId, PathBuf>,
}

impl WatchRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `path` is watched under `id`
    ///
    /// Re-adding a watched path replaces its old id. An id that already
    /// belonged to another path (the kernel hands out the same id for the
    /// same inode) is moved to `path`.
    pub fn register(&mut self, path: impl Into<PathBuf>, id: WatchId) {
        let path = path.into();

        if let Some(old_id) = self.path_to_id.remove(&path) {
            self.id_to_path.remove(&old_id);
        }
        if let Some(old_path) = self.id_to_path.remove(&id) {
            self.path_to_id.remove(&old_path);
        }

        self.path_to_id.insert(path.clone(), id);
        self.id_to_path.insert(id, path);
    }

    /// Forget `path`, returning the id it was watched under
    pub fn unregister_by_path(&mut self, path: &Path) -> Option<WatchId> {
        let id = self.path_to_id.remove(path)?;
        self.id_to_path.remove(&id);
        Some(id)
    }

    /// Forget `id`, returning the path it belonged to
    pub fn unregister_by_id(&mut self, id: WatchId) -> Option<PathBuf> {
        let path = self.id_to_path.remove(&id)?;
        self.path_to_id.remove(&path);
        Some(path)
    }

    /// Path registered under `id`
    pub fn path_for(&self, id: WatchId) -> Option<&Path> {
        self.id_to_path.get(&id).map(PathBuf::as_path)
    }

    /// Id `path` is registered under
    pub fn id_for(&self, path: &Path) -> Option<WatchId> {
        self.path_to_id.get(path).copied()
    }

    /// Snapshot of every registered path, in no particular order
    pub fn all_paths(&self) -> Vec<PathBuf> {
        self.path_to_id.keys().cloned().collect()
    }

    /// Every live `(id, path)` pair, in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (WatchId, &Path)> + '_ {
        self.id_to_path.iter().map(|(id, path)| (*id, path.as_path()))
    }

    /// Number of live watches
    pub fn len(&self) -> usize {
        self.id_to_path.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.id_to_path.is_empty()
    }

    /// Forget every watch
    pub fn clear(&mut self) {
        self.path_to_id.clear();
        self.id_to_path.clear();
    }
}
