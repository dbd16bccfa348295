//! Decoded inotify records

use crate::mask::EventMask;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};

/// Kernel watch descriptor
///
/// Unique among the live watches of one channel, reusable after removal.
/// Queue-overflow records arrive with the id `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(i32);

impl WatchId {
    /// Wrap a descriptor returned by the kernel
    pub const fn from_raw(wd: i32) -> Self {
        Self(wd)
    }

    /// The raw descriptor, as passed to `inotify_rm_watch`
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One notification record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub watch_id: WatchId,
    pub mask: EventMask,
    /// Pairs `MOVED_FROM` with `MOVED_TO`, otherwise 0
    pub cookie: u32,
    /// Length of the padded name field as declared by the kernel
    pub name_len: u32,
    /// Entry name for events inside a watched directory
    pub name: Option<OsString>,
    /// Path of the watch, as registered when the record was read
    pub watch_path: Option<PathBuf>,
}

impl Event {
    /// Watched path joined with the entry name
    ///
    /// `None` when the watch was unknown at read time (for example a queue
    /// overflow record).
    pub fn full_path(&self) -> Option<PathBuf> {
        let watch_path = self.watch_path.as_deref()?;
        Some(match &self.name {
            Some(name) => watch_path.join(name),
            None => watch_path.to_path_buf(),
        })
    }

    /// Entry name, for events inside a watched directory
    pub fn name(&self) -> Option<&OsStr> {
        self.name.as_deref()
    }

    /// Watched path this record belongs to, if it was known
    pub fn watch_path(&self) -> Option<&Path> {
        self.watch_path.as_deref()
    }

    /// True if any bit of `mask` is set on this record
    pub fn is(&self, mask: EventMask) -> bool {
        self.mask.intersects(mask)
    }
}
